//! Shared fixtures for the gmsec-spec integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use gmsec_core::{keys, Config, Field, FieldValue, Message, MessageKind};
use gmsec_spec::{Specification, ValidationLevel};

/// Root of the checked-in schema tree (one directory per version).
pub fn schema_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../templates")
}

/// Configuration pointing at the checked-in tree.
pub fn config(level: u32, validation: ValidationLevel, legacy: bool) -> Config {
    let mut cfg = Config::new();
    cfg.add_value(keys::SCHEMA_PATH, &schema_root().to_string_lossy());
    cfg.add_value(keys::SCHEMA_LEVEL, &level.to_string());
    cfg.add_value(keys::VALIDATION_LEVEL, validation.as_str());
    cfg.add_value(keys::LEGACY_SCHEMA_FILES, if legacy { "true" } else { "false" });
    cfg
}

/// Specification over the checked-in tree.
pub fn spec(level: u32, validation: ValidationLevel, legacy: bool) -> Specification {
    Specification::new(&config(level, validation, legacy)).expect("fixture tree loads")
}

/// Unbound message carrying the given fields.
pub fn message(subject: &str, kind: MessageKind, fields: Vec<(&str, FieldValue)>) -> Message {
    let mut msg = Message::new(subject, kind);
    for (name, value) in fields {
        msg.add_field(Field::new(name, value).expect("valid field name"));
    }
    msg
}

/// A valid C2MS log message.
pub fn log_message(severity: i16) -> Message {
    message(
        "C2MS.SAT1.MSG.LOG",
        MessageKind::Publish,
        vec![
            ("MESSAGE-TYPE", "MSG".into()),
            ("MESSAGE-SUBTYPE", "LOG".into()),
            ("SUBCLASS", "INFO".into()),
            ("SEVERITY", severity.into()),
        ],
    )
}
