//! # End-to-end Validation Scenarios
//!
//! Loads the checked-in schema tree and validates messages through the
//! public `Specification` API, in both markup dialects.

mod common;

use common::{log_message, message, spec};
use gmsec_core::{keys, Config, Field, FieldValue, MessageKind};
use gmsec_spec::{error_codes, ErrorClass, SpecificationError, ValidationLevel, ViolationKind};

fn violations(err: &SpecificationError) -> Vec<(String, ViolationKind, String)> {
    err.violations()
        .expect("validation failure carries violations")
        .iter()
        .map(|v| (v.field.clone(), v.kind, v.message.clone()))
        .collect()
}

// -- Scenario A: value ranges -------------------------------------------------

#[test]
fn test_log_message_within_range_passes() {
    for legacy in [true, false] {
        let spec = spec(0, ValidationLevel::EnforceRequired, legacy);
        spec.validate_message(&log_message(2)).unwrap();
    }
}

#[test]
fn test_log_message_out_of_range_reports_one_violation() {
    for legacy in [true, false] {
        let spec = spec(0, ValidationLevel::EnforceRequired, legacy);
        let err = spec.validate_message(&log_message(9)).unwrap_err();
        assert_eq!(err.class(), ErrorClass::MessageValidation);
        assert_eq!(err.code(), error_codes::MESSAGE_VALIDATION_FAILED);

        let found = violations(&err);
        assert_eq!(found.len(), 1, "{found:?}");
        assert_eq!(found[0].0, "SEVERITY");
        assert_eq!(found[0].1, ViolationKind::InvalidValue);
        assert!(found[0].2.contains('9'));
        assert!(err.to_string().contains("2019.00.C2MS.MSG.LOG"));
    }
}

#[test]
fn test_range_bounds_are_inclusive() {
    let spec = spec(0, ValidationLevel::EnforceRequired, false);
    spec.validate_message(&log_message(1)).unwrap();
    spec.validate_message(&log_message(4)).unwrap();
    assert!(spec.validate_message(&log_message(0)).is_err());
    assert!(spec.validate_message(&log_message(5)).is_err());
}

// -- Scenario B: missing required field ---------------------------------------

#[test]
fn test_missing_required_field_message_text() {
    for legacy in [true, false] {
        let spec = spec(0, ValidationLevel::EnforceRequired, legacy);
        let mut msg = log_message(2);
        msg.remove_field("SUBCLASS");

        let err = spec.validate_message(&msg).unwrap_err();
        let found = violations(&err);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1, ViolationKind::MissingField);
        assert_eq!(found[0].2, "SUBCLASS is a required field, but is missing from message.");
    }
}

// -- Scenario C: strict mode --------------------------------------------------

#[test]
fn test_strict_mode_flags_undeclared_field() {
    let mut msg = log_message(2);
    msg.add_field(Field::new("UNEXPECTED-FIELD", "x").unwrap());

    let strict = spec(0, ValidationLevel::EnforceStrict, false);
    let err = strict.validate_message(&msg).unwrap_err();
    let found = violations(&err);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].0, "UNEXPECTED-FIELD");
    assert_eq!(found[0].1, ViolationKind::DisallowedField);

    for level in [ValidationLevel::EnforceRequired, ValidationLevel::EnforceOptional] {
        spec(0, level, false).validate_message(&msg).unwrap();
    }
}

#[test]
fn test_strict_mode_accepts_declared_optional_and_reserved_fields() {
    let mut msg = log_message(2);
    msg.add_field(Field::new("MSG-TEXT", "started").unwrap());
    msg.add_field(Field::new("MISSION-ID", "SAT1").unwrap());
    msg.add_field(Field::new("NODE", "ground-3").unwrap());
    msg.add_field(Field::new("SUBSCRIPTION.1.SUBJECT-PATTERN", "C2MS.>").unwrap());
    spec(0, ValidationLevel::EnforceStrict, true).validate_message(&msg).unwrap();
}

// -- Optional-field enforcement -----------------------------------------------

#[test]
fn test_optional_fields_checked_from_enforce_optional() {
    let mut msg = log_message(2);
    msg.add_field(Field::new("MSG-TEXT", 42i32).unwrap());

    spec(0, ValidationLevel::EnforceRequired, false).validate_message(&msg).unwrap();

    let err = spec(0, ValidationLevel::EnforceOptional, false)
        .validate_message(&msg)
        .unwrap_err();
    let found = violations(&err);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].0, "MSG-TEXT");
    assert_eq!(found[0].1, ViolationKind::InvalidType);
}

#[test]
fn test_type_violation_suppresses_value_check() {
    let mut msg = log_message(2);
    msg.add_field(Field::new("SEVERITY", 99i32).unwrap());
    let err = spec(0, ValidationLevel::EnforceRequired, false)
        .validate_message(&msg)
        .unwrap_err();
    let found = violations(&err);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].1, ViolationKind::InvalidType);
}

#[test]
fn test_content_pattern_checked_for_present_optional_field() {
    let spec = spec(0, ValidationLevel::EnforceRequired, false);
    let mut msg = log_message(2);
    msg.add_field(Field::new("EVENT-TIME", "2019-100-12:30:45.250").unwrap());
    spec.validate_message(&msg).unwrap();

    msg.add_field(Field::new("EVENT-TIME", "yesterday").unwrap());
    let err = spec.validate_message(&msg).unwrap_err();
    let found = violations(&err);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].1, ViolationKind::InvalidContent);
}

#[test]
fn test_no_enforcement_accepts_anything() {
    let spec = spec(0, ValidationLevel::NoEnforcement, false);
    let junk = message("", MessageKind::Publish, vec![("WHATEVER", FieldValue::Bool(true))]);
    spec.validate_message(&junk).unwrap();
    assert_eq!(spec.registry().resolution_count(), 0);
}

// -- Dependencies -------------------------------------------------------------

#[test]
fn test_dependency_makes_optional_field_required() {
    for legacy in [true, false] {
        let spec = spec(0, ValidationLevel::EnforceRequired, legacy);
        let mut resp = message(
            "C2MS.SAT1.RESP.DIR",
            MessageKind::Reply,
            vec![
                ("MESSAGE-TYPE", "RESP".into()),
                ("MESSAGE-SUBTYPE", "DIR".into()),
                ("RESPONSE-STATUS", 1i16.into()),
            ],
        );
        spec.validate_message(&resp).unwrap();

        resp.add_field(Field::new("RESPONSE-STATUS", 3i16).unwrap());
        let err = spec.validate_message(&resp).unwrap_err();
        let found = violations(&err);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, "RETURN-VALUE");
        assert_eq!(found[0].1, ViolationKind::MissingField);

        resp.add_field(Field::new("RETURN-VALUE", 0i32).unwrap());
        spec.validate_message(&resp).unwrap();
    }
}

// -- Tracking policy ----------------------------------------------------------

#[test]
fn test_reserved_field_rejected_when_tracking_off() {
    let spec = spec(0, ValidationLevel::EnforceStrict, false);
    let mut connection = Config::new();
    connection.add_value(keys::TRACKING_CONNECTION_ID, "OFF");

    let mut msg = log_message(2);
    msg.add_field(Field::new("CONNECTION-ID", 12u32).unwrap());

    let err = spec.validate_for_publish(&msg, &connection).unwrap_err();
    let found = violations(&err);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].0, "CONNECTION-ID");
    assert_eq!(found[0].1, ViolationKind::ReservedField);

    // Plain validation has no publish context.
    spec.validate_message(&msg).unwrap();

    for value in ["ON", ""] {
        let mut flipped = Config::new();
        if !value.is_empty() {
            flipped.add_value(keys::TRACKING_CONNECTION_ID, value);
        }
        spec.validate_for_publish(&msg, &flipped).unwrap();
    }

    msg.remove_field("CONNECTION-ID");
    spec.validate_for_publish(&msg, &connection).unwrap();
}

#[test]
fn test_message_config_can_turn_tracking_off() {
    let spec = spec(0, ValidationLevel::EnforceRequired, false);
    let mut msg = log_message(2);
    msg.add_field(Field::new("NODE", "host").unwrap());
    let mut cfg = Config::new();
    cfg.add_value(keys::TRACKING, "OFF");
    msg.set_config(cfg);

    let mut connection = Config::new();
    connection.add_value(keys::TRACKING_NODE, "ON");
    assert!(spec.validate_for_publish(&msg, &connection).is_err());
}

#[test]
fn test_send_and_receive_toggles() {
    let mut cfg = common::config(0, ValidationLevel::EnforceRequired, false);
    cfg.add_value(keys::VALIDATE_SEND, "true");
    let spec = gmsec_spec::Specification::new(&cfg).unwrap();

    let bad = log_message(9);
    assert!(spec.validate_on_send(&bad, &Config::new()).is_err());
    spec.validate_on_receive(&bad).unwrap();

    let mut cfg = common::config(0, ValidationLevel::EnforceRequired, false);
    cfg.add_value(keys::VALIDATE_ALL, "true");
    let spec = gmsec_spec::Specification::new(&cfg).unwrap();
    assert!(spec.validate_on_send(&bad, &Config::new()).is_err());
    assert!(spec.validate_on_receive(&bad).is_err());
}

// -- Monotonic strictness -----------------------------------------------------

#[test]
fn test_violation_count_never_decreases_with_level() {
    let mut extra = log_message(9);
    extra.add_field(Field::new("MSG-TEXT", 1u8).unwrap());
    extra.add_field(Field::new("UNEXPECTED", "x").unwrap());
    let mut missing = log_message(2);
    missing.remove_field("SUBCLASS");
    missing.add_field(Field::new("EVENT-TIME", "soon").unwrap());

    for msg in [log_message(2), log_message(9), extra, missing] {
        let mut previous = 0;
        for level in ValidationLevel::ALL {
            let count = match spec(0, level, false).validate_message(&msg) {
                Ok(()) => 0,
                Err(err) => err.violations().map_or(0, |v| v.len()),
            };
            assert!(count >= previous, "{level}: {count} < {previous} for {msg}");
            previous = count;
        }
    }
}
