//! # Validation Engine
//!
//! Compares a message against its resolved [`MessageTemplate`].
//!
//! The template tree is walked recursively. Arrays repeat their child block
//! once per element, with placeholders replaced by 1..N. Containers repeat
//! theirs under the `<name>.<i>.` prefix. Every applicable check runs and
//! every violation is collected; nothing short-circuits.
//!
//! ## Per-field checks
//!
//! | check              | applies when                                          |
//! |--------------------|-------------------------------------------------------|
//! | content pattern    | field present, any level above NO_ENFORCEMENT         |
//! | presence           | REQUIRED                                              |
//! | type and value     | REQUIRED; OPTIONAL from ENFORCE_OPTIONAL upward       |
//! | undeclared field   | ENFORCE_STRICT, reserved tracking names excepted      |
//!
//! Dependencies may override a field's mode, types, or values; the first
//! rule whose trigger field is present (with the expected value, if any)
//! applies.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use gmsec_core::{FieldType, FieldValue, Message};
use serde::Serialize;

use crate::config::ValidationLevel;
use crate::template::{
    substitute_indices, FieldMode, FieldTemplate, MessageTemplate, TemplateKind, ValueConstraint,
};
use crate::tracking;

/// Array and container counts above this are rejected rather than walked.
pub const MAX_REPETITIONS: i128 = 65_535;

// ---------------------------------------------------------------------------
// Violations
// ---------------------------------------------------------------------------

/// Category of a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// REQUIRED field absent.
    MissingField,
    /// Wire type not among the allowed types.
    InvalidType,
    /// Value outside the allowed set.
    InvalidValue,
    /// Value fails its content pattern.
    InvalidContent,
    /// REQUIRED array or container count field absent.
    UndefinedArraySize,
    /// Count field is not a usable non-negative integer.
    InvalidArraySize,
    /// Field not declared by the template.
    DisallowedField,
    /// Reserved tracking field present while its tracking concern is off.
    ReservedField,
}

/// One violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Concrete field name.
    pub field: String,
    /// Category.
    pub kind: ViolationKind,
    /// Human-readable description.
    pub message: String,
}

impl Violation {
    fn new(field: impl Into<String>, kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn reserved(field: &str, message: String) -> Self {
        Self::new(field, ViolationKind::ReservedField, message)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Every violation from one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationViolations(Vec<Violation>);

impl ValidationViolations {
    /// The violations, in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.0.iter()
    }

    /// Number of violations.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the message passed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Violations of one kind.
    pub fn of_kind(&self, kind: ViolationKind) -> impl Iterator<Item = &Violation> {
        self.0.iter().filter(move |v| v.kind == kind)
    }

    /// Violations naming `field`.
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a Violation> {
        self.0.iter().filter(move |v| v.field == field)
    }

    pub(crate) fn push(&mut self, violation: Violation) {
        self.0.push(violation);
    }

    pub(crate) fn extend(&mut self, more: impl IntoIterator<Item = Violation>) {
        self.0.extend(more);
    }
}

impl From<Vec<Violation>> for ValidationViolations {
    fn from(v: Vec<Violation>) -> Self {
        Self(v)
    }
}

impl IntoIterator for ValidationViolations {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "    {v}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Stateless comparison of messages against templates.
#[derive(Debug, Clone, Copy)]
pub struct ValidationEngine {
    level: ValidationLevel,
}

impl ValidationEngine {
    /// Engine enforcing `level`.
    pub fn new(level: ValidationLevel) -> Self {
        Self { level }
    }

    /// Enforcement level.
    pub fn level(&self) -> ValidationLevel {
        self.level
    }

    /// Compare `message` with `template`. Tracking policy is not applied
    /// here; see `TrackingPolicy::check`.
    pub fn compare(&self, template: &MessageTemplate, message: &Message) -> ValidationViolations {
        let mut pass = Pass {
            level: self.level,
            message,
            declared: HashSet::new(),
            violations: ValidationViolations::default(),
        };
        if self.level == ValidationLevel::NoEnforcement {
            return pass.violations;
        }

        pass.visit_all(&template.fields, &Scope::root());

        if self.level >= ValidationLevel::EnforceStrict {
            for field in message.fields() {
                let name = field.name();
                if !pass.declared.contains(name) && !tracking::is_reserved(name) {
                    pass.violations.push(Violation::new(
                        name,
                        ViolationKind::DisallowedField,
                        format!("{name} is a disallowed user-defined field for {}", template.schema_id),
                    ));
                }
            }
        }
        pass.violations
    }
}

/// Name context: container prefix plus the active array indices.
#[derive(Debug, Clone)]
struct Scope<'t> {
    prefix: String,
    indices: Vec<(&'t str, usize)>,
}

impl<'t> Scope<'t> {
    fn root() -> Self {
        Self {
            prefix: String::new(),
            indices: Vec::new(),
        }
    }

    fn apply(&self, name: &str) -> String {
        format!("{}{}", self.prefix, substitute_indices(name, &self.indices))
    }
}

struct Pass<'m> {
    level: ValidationLevel,
    message: &'m Message,
    declared: HashSet<String>,
    violations: ValidationViolations,
}

/// Mode, types, and values after dependency overrides.
struct Rules<'t> {
    mode: FieldMode,
    types: &'t [FieldType],
    values: &'t [String],
}

impl<'m> Pass<'m> {
    fn visit_all<'t>(&mut self, templates: &'t [FieldTemplate], scope: &Scope<'t>) {
        for t in templates {
            match &t.kind {
                TemplateKind::Field => self.check_field(t, scope),
                TemplateKind::Array {
                    size_field,
                    index,
                    optional,
                } => {
                    let count_name = scope.apply(size_field);
                    let Some(count) = self.repetitions(&t.name, &count_name, *optional, scope) else {
                        continue;
                    };
                    for i in 1..=count {
                        let mut inner = scope.clone();
                        inner.indices.push((index.as_str(), i));
                        self.visit_all(&t.children, &inner);
                    }
                }
                TemplateKind::Container { optional } => {
                    let base = scope.apply(&t.name);
                    let count_name = format!("NUM-OF-{base}");
                    let Some(count) = self.repetitions(&t.name, &count_name, *optional, scope) else {
                        continue;
                    };
                    for i in 1..=count {
                        let inner = Scope {
                            prefix: format!("{base}.{i}."),
                            indices: scope.indices.clone(),
                        };
                        self.visit_all(&t.children, &inner);
                    }
                }
            }
        }
    }

    /// Element count for an array or container, or `None` to skip it.
    fn repetitions(&mut self, name: &str, count_name: &str, optional: bool, scope: &Scope<'_>) -> Option<usize> {
        self.declared.insert(count_name.to_string());
        let control = scope.apply(name);
        let message = self.message;
        let Some(field) = message.get_field(count_name) else {
            if !optional {
                self.violations.push(Violation::new(
                    count_name,
                    ViolationKind::UndefinedArraySize,
                    format!("{control} is a required array, but its size field {count_name} is missing from message."),
                ));
            }
            return None;
        };
        let count = field
            .value()
            .as_i128()
            .or_else(|| field.value().as_str().and_then(|text| text.trim().parse::<i128>().ok()));
        match count {
            Some(n) if (0..=MAX_REPETITIONS).contains(&n) => usize::try_from(n).ok(),
            _ => {
                self.violations.push(Violation::new(
                    count_name,
                    ViolationKind::InvalidArraySize,
                    format!(
                        "{count_name} must hold an integer element count between 0 and {MAX_REPETITIONS} for {control}, found {}",
                        field.value()
                    ),
                ));
                None
            }
        }
    }

    fn effective_rules<'t>(&self, t: &'t FieldTemplate, scope: &Scope<'t>) -> Rules<'t> {
        let mut rules = Rules {
            mode: t.mode,
            types: &t.types,
            values: &t.values,
        };
        let triggered = t.dependencies.iter().find(|dep| {
            let trigger = scope.apply(&dep.field);
            match (self.message.get_field(&trigger), &dep.equals) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(f), Some(expected)) => value_allowed(f.value(), std::slice::from_ref(expected)),
            }
        });
        if let Some(dep) = triggered {
            if let Some(mode) = dep.mode {
                rules.mode = mode;
            }
            if let Some(types) = &dep.types {
                rules.types = types;
            }
            if let Some(values) = &dep.values {
                rules.values = values;
            }
        }
        rules
    }

    fn check_field<'t>(&mut self, t: &'t FieldTemplate, scope: &Scope<'t>) {
        let name = scope.apply(&t.name);
        let rules = self.effective_rules(t, scope);
        let message = self.message;
        let field = message.get_field(&name);
        self.declared.insert(name.clone());

        let Some(field) = field else {
            if rules.mode == FieldMode::Required {
                self.violations.push(Violation::new(
                    &name,
                    ViolationKind::MissingField,
                    format!("{name} is a required field, but is missing from message."),
                ));
            }
            return;
        };

        if let Some(pattern) = t.pattern {
            let text = field.value().to_value_string();
            if !pattern.matches(&text) {
                self.violations.push(Violation::new(
                    &name,
                    ViolationKind::InvalidContent,
                    format!("{name} has value \"{text}\", which is not a valid {pattern} string"),
                ));
            }
        }

        let enforce = match rules.mode {
            FieldMode::Required => true,
            FieldMode::Optional => self.level >= ValidationLevel::EnforceOptional,
            FieldMode::Control => false,
        };
        if !enforce {
            return;
        }

        let actual = field.field_type();
        if !rules.types.is_empty() && !rules.types.contains(&actual) {
            let expected = rules
                .types
                .iter()
                .map(FieldType::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            self.violations.push(Violation::new(
                &name,
                ViolationKind::InvalidType,
                format!("{name} has type {actual}, but the template requires {expected}"),
            ));
            return;
        }

        if !rules.values.is_empty() && !value_allowed(field.value(), rules.values) {
            self.violations.push(Violation::new(
                &name,
                ViolationKind::InvalidValue,
                format!(
                    "{name} has value {}, which is not among the allowed values [{}]",
                    field.value(),
                    rules.values.join(", ")
                ),
            ));
        }
    }
}

// ---------------------------------------------------------------------------
// Value sets
// ---------------------------------------------------------------------------

/// True if `value` satisfies at least one allowed-value token.
pub fn value_allowed(value: &FieldValue, allowed: &[String]) -> bool {
    match value {
        FieldValue::Bool(b) => allowed.iter().any(|tok| bool_token(tok) == Some(*b)),
        FieldValue::Char(c) => {
            let text = c.to_string();
            allowed.iter().any(|tok| tok.trim() == text)
        }
        FieldValue::String(s) => allowed.iter().any(|tok| tok == s),
        FieldValue::Binary(_) => true,
        FieldValue::F32(v) => numeric_allowed(*v, allowed),
        FieldValue::F64(v) => numeric_allowed(*v, allowed),
        other => match other.as_i128() {
            Some(v) => numeric_allowed(v, allowed),
            None => false,
        },
    }
}

fn bool_token(token: &str) -> Option<bool> {
    match token.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

/// Range check generic over the numeric representation. Integers compare
/// as `i128`, which holds every integer width exactly; floats compare in
/// their own width. Bounds that do not parse never match.
fn numeric_allowed<T>(value: T, allowed: &[String]) -> bool
where
    T: PartialOrd + FromStr + Copy,
{
    let parse = |s: &str| s.trim().parse::<T>().ok();
    allowed.iter().any(|token| match ValueConstraint::parse(token) {
        ValueConstraint::Exact(x) => parse(x).map_or(false, |x| value == x),
        ValueConstraint::Range(lo, hi) => match (parse(lo), parse(hi)) {
            (Some(lo), Some(hi)) => lo <= value && value <= hi,
            _ => false,
        },
        ValueConstraint::AtLeast(lo) => parse(lo).map_or(false, |lo| value >= lo),
        ValueConstraint::AtMost(hi) => parse(hi).map_or(false, |hi| value <= hi),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmsec_core::{Field, MessageKind};

    fn allowed(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    fn field(name: &str, types: &[FieldType], values: &[&str], mode: FieldMode) -> FieldTemplate {
        FieldTemplate {
            mode,
            types: types.to_vec(),
            values: allowed(values),
            ..FieldTemplate::new(name)
        }
    }

    fn template(fields: Vec<FieldTemplate>) -> MessageTemplate {
        MessageTemplate {
            schema_id: "MSG.TEST".to_string(),
            fq_id: "2019.00.C2MS.MSG.TEST".to_string(),
            level: 0,
            level_name: "C2MS".to_string(),
            kind: MessageKind::Publish,
            description: String::new(),
            subject_elements: Vec::new(),
            header: "C2MS.HEADER".to_string(),
            fields,
        }
    }

    fn message(fields: Vec<(&str, FieldValue)>) -> Message {
        let mut msg = Message::new("C2MS.TEST", MessageKind::Publish);
        for (name, value) in fields {
            msg.add_field(Field::new(name, value).unwrap());
        }
        msg
    }

    fn engine(level: ValidationLevel) -> ValidationEngine {
        ValidationEngine::new(level)
    }

    #[test]
    fn ranges_and_bounds() {
        let range = allowed(&["5..10"]);
        assert!(value_allowed(&FieldValue::I32(5), &range));
        assert!(value_allowed(&FieldValue::I32(10), &range));
        assert!(!value_allowed(&FieldValue::I32(4), &range));
        assert!(!value_allowed(&FieldValue::I32(11), &range));

        let at_least = allowed(&["5+"]);
        assert!(value_allowed(&FieldValue::I64(5), &at_least));
        assert!(value_allowed(&FieldValue::I64(1_000_000), &at_least));
        assert!(!value_allowed(&FieldValue::I64(4), &at_least));

        let at_most = allowed(&["5-"]);
        assert!(value_allowed(&FieldValue::I16(5), &at_most));
        assert!(value_allowed(&FieldValue::I16(-5), &at_most));
        assert!(!value_allowed(&FieldValue::I16(6), &at_most));
    }

    #[test]
    fn wide_unsigned_values_compare_exactly() {
        let range = allowed(&["18446744073709551614..18446744073709551615"]);
        assert!(value_allowed(&FieldValue::U64(u64::MAX), &range));
        assert!(!value_allowed(&FieldValue::U64(u64::MAX - 2), &range));
    }

    #[test]
    fn floats_compare_in_their_own_width() {
        assert!(value_allowed(&FieldValue::F32(1.1), &allowed(&["1.1"])));
        assert!(value_allowed(&FieldValue::F64(2.5), &allowed(&["1.5..2.5"])));
        assert!(!value_allowed(&FieldValue::F64(2.6), &allowed(&["1.5..2.5"])));
    }

    #[test]
    fn booleans_and_strings() {
        assert!(value_allowed(&FieldValue::Bool(true), &allowed(&["TRUE"])));
        assert!(value_allowed(&FieldValue::Bool(false), &allowed(&["0"])));
        assert!(!value_allowed(&FieldValue::Bool(true), &allowed(&["0"])));
        assert!(value_allowed(&FieldValue::from("INFO"), &allowed(&["WARN", "INFO"])));
        assert!(!value_allowed(&FieldValue::from("info"), &allowed(&["INFO"])));
        assert!(value_allowed(&FieldValue::Char('A'), &allowed(&["A"])));
    }

    #[test]
    fn unparseable_bounds_never_match() {
        assert!(!value_allowed(&FieldValue::I32(5), &allowed(&["five"])));
        assert!(!value_allowed(&FieldValue::U8(5), &allowed(&["a..z"])));
    }

    #[test]
    fn missing_required_field_message() {
        let t = template(vec![field("SUBCLASS", &[FieldType::String], &[], FieldMode::Required)]);
        let v = engine(ValidationLevel::EnforceRequired).compare(&t, &message(vec![]));
        assert_eq!(v.len(), 1);
        assert_eq!(
            v.iter().next().unwrap().message,
            "SUBCLASS is a required field, but is missing from message."
        );
    }

    #[test]
    fn optional_fields_checked_from_enforce_optional() {
        let t = template(vec![field("MSG-TEXT", &[FieldType::String], &[], FieldMode::Optional)]);
        let msg = message(vec![("MSG-TEXT", FieldValue::I32(3))]);
        assert!(engine(ValidationLevel::EnforceRequired).compare(&t, &msg).is_empty());
        let v = engine(ValidationLevel::EnforceOptional).compare(&t, &msg);
        assert_eq!(v.of_kind(ViolationKind::InvalidType).count(), 1);
    }

    #[test]
    fn content_patterns_apply_to_optional_fields_at_every_level() {
        let mut t = field("PUBLISH-STAMP", &[FieldType::String], &[], FieldMode::Optional);
        t.pattern = Some(gmsec_core::ContentPattern::Time);
        let t = template(vec![t]);
        let msg = message(vec![("PUBLISH-STAMP", FieldValue::from("noon"))]);
        let v = engine(ValidationLevel::EnforceRequired).compare(&t, &msg);
        assert_eq!(v.of_kind(ViolationKind::InvalidContent).count(), 1);
        assert!(engine(ValidationLevel::NoEnforcement).compare(&t, &msg).is_empty());
    }

    #[test]
    fn empty_header_string_is_rejected() {
        let mut t = field("MESSAGE-SUBTYPE", &[FieldType::String], &[], FieldMode::Required);
        t.pattern = Some(gmsec_core::ContentPattern::HeaderString);
        let t = template(vec![t]);
        let msg = message(vec![("MESSAGE-SUBTYPE", FieldValue::from(""))]);
        let v = engine(ValidationLevel::EnforceRequired).compare(&t, &msg);
        assert_eq!(v.of_kind(ViolationKind::InvalidContent).count(), 1);

        let msg = message(vec![("MESSAGE-SUBTYPE", FieldValue::from("LOG"))]);
        assert!(engine(ValidationLevel::EnforceRequired).compare(&t, &msg).is_empty());
    }

    #[test]
    fn type_violation_suppresses_value_check() {
        let t = template(vec![field("SEVERITY", &[FieldType::I16], &["1..4"], FieldMode::Required)]);
        let v = engine(ValidationLevel::EnforceRequired)
            .compare(&t, &message(vec![("SEVERITY", FieldValue::from("9"))]));
        assert_eq!(v.len(), 1);
        assert_eq!(v.iter().next().unwrap().kind, ViolationKind::InvalidType);
    }

    fn argument_array(optional: bool) -> FieldTemplate {
        FieldTemplate {
            mode: FieldMode::Control,
            kind: TemplateKind::Array {
                size_field: "NUM-OF-ARGUMENTS".to_string(),
                index: "n".to_string(),
                optional,
            },
            children: vec![field("ARGUMENT.n.NAME", &[FieldType::String], &[], FieldMode::Required)],
            ..FieldTemplate::new("ARGUMENT")
        }
    }

    #[test]
    fn arrays_repeat_children_per_element() {
        let t = template(vec![argument_array(false)]);
        let msg = message(vec![
            ("NUM-OF-ARGUMENTS", FieldValue::U16(3)),
            ("ARGUMENT.1.NAME", FieldValue::from("a")),
            ("ARGUMENT.3.NAME", FieldValue::from("c")),
        ]);
        let v = engine(ValidationLevel::EnforceStrict).compare(&t, &msg);
        let missing: Vec<_> = v.of_kind(ViolationKind::MissingField).map(|v| v.field.as_str()).collect();
        assert_eq!(missing, ["ARGUMENT.2.NAME"]);
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn array_size_field_absence() {
        let msg = message(vec![]);
        assert!(engine(ValidationLevel::EnforceStrict)
            .compare(&template(vec![argument_array(true)]), &msg)
            .is_empty());

        let v = engine(ValidationLevel::EnforceStrict).compare(&template(vec![argument_array(false)]), &msg);
        assert_eq!(v.len(), 1);
        assert_eq!(v.iter().next().unwrap().kind, ViolationKind::UndefinedArraySize);
    }

    #[test]
    fn array_size_must_be_an_integer() {
        let msg = message(vec![("NUM-OF-ARGUMENTS", FieldValue::from("two"))]);
        let v = engine(ValidationLevel::EnforceRequired).compare(&template(vec![argument_array(false)]), &msg);
        assert_eq!(v.of_kind(ViolationKind::InvalidArraySize).count(), 1);

        let msg = message(vec![("NUM-OF-ARGUMENTS", FieldValue::I32(-1))]);
        let v = engine(ValidationLevel::EnforceRequired).compare(&template(vec![argument_array(false)]), &msg);
        assert_eq!(v.of_kind(ViolationKind::InvalidArraySize).count(), 1);
    }

    #[test]
    fn array_size_accepts_numeric_text() {
        let msg = message(vec![
            ("NUM-OF-ARGUMENTS", FieldValue::from(" 2 ")),
            ("ARGUMENT.1.NAME", FieldValue::from("a")),
        ]);
        let v = engine(ValidationLevel::EnforceRequired).compare(&template(vec![argument_array(false)]), &msg);
        assert_eq!(v.of_kind(ViolationKind::InvalidArraySize).count(), 0);
        let missing: Vec<_> = v.of_kind(ViolationKind::MissingField).map(|v| v.field.as_str()).collect();
        assert_eq!(missing, ["ARGUMENT.2.NAME"]);
    }

    #[test]
    fn containers_use_num_of_prefix() {
        let container = FieldTemplate {
            mode: FieldMode::Control,
            kind: TemplateKind::Container { optional: false },
            children: vec![field("NAME", &[FieldType::String], &[], FieldMode::Required)],
            ..FieldTemplate::new("PARAM")
        };
        let t = template(vec![container]);
        let msg = message(vec![
            ("NUM-OF-PARAM", FieldValue::I32(2)),
            ("PARAM.1.NAME", FieldValue::from("x")),
            ("PARAM.2.NAME", FieldValue::from("y")),
        ]);
        assert!(engine(ValidationLevel::EnforceStrict).compare(&t, &msg).is_empty());
    }

    #[test]
    fn dependencies_override_mode() {
        let mut ret = field("RETURN-VALUE", &[FieldType::I32], &[], FieldMode::Optional);
        ret.dependencies.push(crate::template::FieldDependency {
            field: "RESPONSE-STATUS".to_string(),
            equals: Some("3".to_string()),
            mode: Some(FieldMode::Required),
            types: None,
            values: None,
        });
        let t = template(vec![
            field("RESPONSE-STATUS", &[FieldType::I16], &[], FieldMode::Required),
            ret,
        ]);

        let working = message(vec![("RESPONSE-STATUS", FieldValue::I16(2))]);
        assert!(engine(ValidationLevel::EnforceRequired).compare(&t, &working).is_empty());

        let done = message(vec![("RESPONSE-STATUS", FieldValue::I16(3))]);
        let v = engine(ValidationLevel::EnforceRequired).compare(&t, &done);
        assert_eq!(v.for_field("RETURN-VALUE").count(), 1);
    }

    #[test]
    fn dependency_triggers_follow_value_set_rules() {
        let mut detail = field("DETAIL", &[FieldType::String], &[], FieldMode::Optional);
        detail.dependencies.push(crate::template::FieldDependency {
            field: "VERBOSE".to_string(),
            equals: Some("1".to_string()),
            mode: Some(FieldMode::Required),
            types: None,
            values: None,
        });
        let t = template(vec![
            field("VERBOSE", &[FieldType::Bool], &[], FieldMode::Required),
            detail,
        ]);

        let quiet = message(vec![("VERBOSE", FieldValue::Bool(false))]);
        assert!(engine(ValidationLevel::EnforceRequired).compare(&t, &quiet).is_empty());

        let verbose = message(vec![("VERBOSE", FieldValue::Bool(true))]);
        let v = engine(ValidationLevel::EnforceRequired).compare(&t, &verbose);
        assert_eq!(v.for_field("DETAIL").count(), 1);
        assert_eq!(v.iter().next().unwrap().kind, ViolationKind::MissingField);
    }

    #[test]
    fn violations_serialize_with_snake_case_kinds() {
        let t = template(vec![field("SEVERITY", &[FieldType::I16], &["1..5"], FieldMode::Required)]);
        let msg = message(vec![("SEVERITY", FieldValue::I16(9))]);
        let v = engine(ValidationLevel::EnforceRequired).compare(&t, &msg);

        let json = serde_json::to_value(&v).unwrap();
        let entries = json.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["field"], "SEVERITY");
        assert_eq!(entries[0]["kind"], "invalid_value");
    }

    #[test]
    fn strict_mode_flags_undeclared_but_not_reserved_fields() {
        let t = template(vec![field("A", &[], &[], FieldMode::Optional)]);
        let msg = message(vec![
            ("UNEXPECTED-FIELD", FieldValue::I32(1)),
            ("NODE", FieldValue::from("host")),
        ]);
        let v = engine(ValidationLevel::EnforceStrict).compare(&t, &msg);
        assert_eq!(v.len(), 1);
        assert_eq!(v.iter().next().unwrap().field, "UNEXPECTED-FIELD");
        assert!(engine(ValidationLevel::EnforceOptional).compare(&t, &msg).is_empty());
    }

    #[test]
    fn display_indents_each_violation() {
        let v = ValidationViolations::from(vec![
            Violation::new("A", ViolationKind::MissingField, "first"),
            Violation::new("B", ViolationKind::MissingField, "second"),
        ]);
        assert_eq!(v.to_string(), "    first\n    second");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn range_membership_matches_arithmetic(lo in -1000i64..1000, span in 0i64..1000, v in -3000i64..3000) {
                let hi = lo + span;
                let tokens = vec![format!("{lo}..{hi}")];
                prop_assert_eq!(value_allowed(&FieldValue::I64(v), &tokens), lo <= v && v <= hi);
            }

            #[test]
            fn open_bounds_match_arithmetic(bound in -1000i32..1000, v in -3000i32..3000) {
                prop_assert_eq!(value_allowed(&FieldValue::I32(v), &[format!("{bound}+")]), v >= bound);
                prop_assert_eq!(value_allowed(&FieldValue::I32(v), &[format!("{bound}-")]), v <= bound);
            }
        }
    }
}
