//! # Templates
//!
//! The normalized, dialect-independent shape of a loaded schema.
//!
//! - [`FieldTemplate`] is one field contract, or an array/container control
//!   whose `children` describe one repeated block.
//! - [`MessageTemplate`] is one message type: identity, level, subject
//!   elements, and the composed header-plus-content field list.
//! - [`SchemaTemplate`] is one directory entry: the definition fields that
//!   build a composite Schema ID at a given level.
//!
//! Array controls are stored as a tree rather than as paired start/end
//! markers in a flat list; validation walks the tree recursively.

use std::fmt;

use gmsec_core::{ContentPattern, FieldDeclaration, FieldType, MessageKind, TemplateBinding};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Field attributes
// ---------------------------------------------------------------------------

/// Presence requirement of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldMode {
    /// Must be present.
    Required,
    /// May be present.
    Optional,
    /// Array or container marker; never a message field itself.
    Control,
}

impl FieldMode {
    /// Parse a mode token, case-insensitively.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "REQUIRED" => Some(FieldMode::Required),
            "OPTIONAL" => Some(FieldMode::Optional),
            "CONTROL" => Some(FieldMode::Control),
            _ => None,
        }
    }

    /// Canonical token.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldMode::Required => "REQUIRED",
            FieldMode::Optional => "OPTIONAL",
            FieldMode::Control => "CONTROL",
        }
    }
}

impl fmt::Display for FieldMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a field belongs to the message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldClass {
    /// Header field, shared by every message at a level.
    Header,
    /// Message-specific content field.
    Standard,
}

impl FieldClass {
    /// Parse a class token, case-insensitively.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "HEADER" => Some(FieldClass::Header),
            "STANDARD" => Some(FieldClass::Standard),
            _ => None,
        }
    }

    /// Canonical token.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldClass::Header => "HEADER",
            FieldClass::Standard => "STANDARD",
        }
    }
}

/// Structural role of a template entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TemplateKind {
    /// Ordinary field.
    Field,
    /// Repeated block. `size_field` names the field holding the element
    /// count; `index` is the name segment replaced by 1..N in child names.
    Array {
        /// Full name of the count field (may itself contain outer placeholders).
        size_field: String,
        /// Placeholder segment, typically `n`.
        index: String,
        /// Absent count field skips the block instead of failing.
        optional: bool,
    },
    /// Named child container, counted by `NUM-OF-<name>`, with children
    /// named relative to `<name>.<i>.`.
    Container {
        /// Absent count field skips the container instead of failing.
        optional: bool,
    },
}

// ---------------------------------------------------------------------------
// Value constraints
// ---------------------------------------------------------------------------

/// One parsed allowed-value token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueConstraint<'a> {
    /// Exact literal.
    Exact(&'a str),
    /// Inclusive `lo..hi`.
    Range(&'a str, &'a str),
    /// `n+`, at least `n`.
    AtLeast(&'a str),
    /// `n-`, at most `n`.
    AtMost(&'a str),
}

impl<'a> ValueConstraint<'a> {
    /// Classify an allowed-value token. Bounds stay textual; they are parsed
    /// in the width of the field being checked.
    pub fn parse(token: &'a str) -> Self {
        let token = token.trim();
        if let Some((lo, hi)) = token.split_once("..") {
            if !lo.is_empty() && !hi.is_empty() {
                return ValueConstraint::Range(lo.trim(), hi.trim());
            }
        }
        if token.len() > 1 {
            if let Some(lo) = token.strip_suffix('+') {
                return ValueConstraint::AtLeast(lo);
            }
            if let Some(hi) = token.strip_suffix('-') {
                return ValueConstraint::AtMost(hi);
            }
        }
        ValueConstraint::Exact(token)
    }

    /// True for a plain literal.
    pub fn is_exact(&self) -> bool {
        matches!(self, ValueConstraint::Exact(_))
    }
}

// ---------------------------------------------------------------------------
// FieldDependency
// ---------------------------------------------------------------------------

/// A conditional override: when `field` is present (and equals `equals`,
/// if given), this field's mode, types, or values are replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDependency {
    /// Field whose value triggers the rule.
    pub field: String,
    /// Required textual value of the trigger; `None` means any value.
    pub equals: Option<String>,
    /// Replacement mode.
    pub mode: Option<FieldMode>,
    /// Replacement allowed types.
    pub types: Option<Vec<FieldType>>,
    /// Replacement allowed values.
    pub values: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// FieldTemplate
// ---------------------------------------------------------------------------

/// The schema-declared contract for one field or one control marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldTemplate {
    /// Field name. Inside arrays this is the full name with placeholders,
    /// e.g. `ARGUMENT.n.NAME`; inside containers it is relative.
    pub name: String,
    /// Presence requirement.
    pub mode: FieldMode,
    /// Header or content.
    pub class: FieldClass,
    /// Structural role.
    #[serde(flatten)]
    pub kind: TemplateKind,
    /// Allowed types; empty means any.
    pub types: Vec<FieldType>,
    /// Allowed-value tokens; empty means unrestricted.
    pub values: Vec<String>,
    /// Free-text description.
    pub description: String,
    /// Content-pattern tag.
    pub pattern: Option<ContentPattern>,
    /// Conditional overrides, first match wins.
    pub dependencies: Vec<FieldDependency>,
    /// Repeated block of an array or container.
    pub children: Vec<FieldTemplate>,
}

impl FieldTemplate {
    /// A REQUIRED, STANDARD, any-typed field with no constraints.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: FieldMode::Required,
            class: FieldClass::Standard,
            kind: TemplateKind::Field,
            types: Vec::new(),
            values: Vec::new(),
            description: String::new(),
            pattern: None,
            dependencies: Vec::new(),
            children: Vec::new(),
        }
    }

    /// True for array and container markers.
    pub fn is_control(&self) -> bool {
        !matches!(self.kind, TemplateKind::Field)
    }

    /// True if any type is acceptable.
    pub fn is_variable(&self) -> bool {
        self.types.is_empty()
    }

    /// Comma-joined type tokens, `VARIABLE` when unrestricted.
    pub fn type_list(&self) -> String {
        if self.types.is_empty() {
            return "VARIABLE".to_string();
        }
        self.types.iter().map(FieldType::as_str).collect::<Vec<_>>().join(",")
    }

    /// The single literal value this field is fixed to, if exactly one is
    /// declared and it is not a range or bound.
    pub fn explicit_value(&self) -> Option<&str> {
        match self.values.as_slice() {
            [only] => match ValueConstraint::parse(only) {
                ValueConstraint::Exact(v) => Some(v),
                _ => None,
            },
            _ => None,
        }
    }

    /// Apply a closure to this template and every descendant, depth first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a FieldTemplate)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// Substitute array indices into a template name, outermost first.
///
/// Scanning left to right, each segment equal to the next pending
/// placeholder is replaced by its index, so nested arrays may reuse the same
/// placeholder (`A.n.B.n.C` with `[("n", 2), ("n", 5)]` gives `A.2.B.5.C`).
pub fn substitute_indices(name: &str, indices: &[(&str, usize)]) -> String {
    let mut pending = indices.iter().peekable();
    name.split('.')
        .map(|seg| match pending.peek() {
            Some((placeholder, index)) if *placeholder == seg => {
                let out = index.to_string();
                pending.next();
                out
            }
            _ => seg.to_string(),
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Segment-wise match of a template name against a concrete field name,
/// treating `placeholders` as wildcards for positive integers.
fn name_matches(pattern: &str, actual: &str, placeholders: &[&str]) -> bool {
    let mut pat = pattern.split('.');
    let mut act = actual.split('.');
    loop {
        match (pat.next(), act.next()) {
            (None, None) => return true,
            (Some(p), Some(a)) => {
                let ok = p == a
                    || (placeholders.contains(&p) && a.parse::<u32>().map_or(false, |i| i > 0));
                if !ok {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

/// Locate the template naming `actual` among `fields`, descending through
/// arrays (placeholder wildcards) and containers (relative names).
fn find_in<'a>(
    fields: &'a [FieldTemplate],
    actual: &str,
    placeholders: &mut Vec<&'a str>,
) -> Option<&'a FieldTemplate> {
    for t in fields {
        match &t.kind {
            TemplateKind::Field => {
                if name_matches(&t.name, actual, placeholders) {
                    return Some(t);
                }
            }
            TemplateKind::Array { index, .. } => {
                placeholders.push(index);
                let found = find_in(&t.children, actual, placeholders);
                placeholders.pop();
                if found.is_some() {
                    return found;
                }
            }
            TemplateKind::Container { .. } => {
                let depth = t.name.split('.').count();
                let segments: Vec<&str> = actual.splitn(depth + 2, '.').collect();
                if segments.len() == depth + 2
                    && name_matches(&t.name, &segments[..depth].join("."), placeholders)
                    && segments[depth].parse::<u32>().map_or(false, |i| i > 0)
                {
                    if let Some(found) = find_in(&t.children, segments[depth + 1], placeholders) {
                        return Some(found);
                    }
                }
            }
        }
    }
    None
}

// ---------------------------------------------------------------------------
// MessageTemplate
// ---------------------------------------------------------------------------

/// One fully resolved message type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    /// Shorthand Schema ID, e.g. `MSG.LOG`.
    pub schema_id: String,
    /// Fully-qualified Schema ID, e.g. `2019.00.C2MS.MSG.LOG`.
    pub fq_id: String,
    /// Schema level the template was defined at.
    pub level: u32,
    /// Name of that level, e.g. `C2MS`.
    pub level_name: String,
    /// Message kind.
    pub kind: MessageKind,
    /// Free-text description.
    pub description: String,
    /// Subject elements: field names, or `FILL` for free segments.
    pub subject_elements: Vec<String>,
    /// Key of the header definition composed into `fields`.
    pub header: String,
    /// Header fields followed by content fields.
    pub fields: Vec<FieldTemplate>,
}

impl MessageTemplate {
    /// Template naming the concrete field `name` (array indices and
    /// container indices already substituted).
    pub fn find_field(&self, name: &str) -> Option<&FieldTemplate> {
        find_in(&self.fields, name, &mut Vec::new())
    }

    /// Header-class entries.
    pub fn header_fields(&self) -> impl Iterator<Item = &FieldTemplate> {
        self.fields.iter().filter(|f| f.class == FieldClass::Header)
    }

    /// Content entries.
    pub fn content_fields(&self) -> impl Iterator<Item = &FieldTemplate> {
        self.fields.iter().filter(|f| f.class == FieldClass::Standard)
    }
}

impl TemplateBinding for MessageTemplate {
    fn schema_id(&self) -> &str {
        &self.fq_id
    }

    fn declaration(&self, field_name: &str) -> Option<FieldDeclaration> {
        self.find_field(field_name).map(|t| FieldDeclaration {
            types: t.types.clone(),
            header: t.class == FieldClass::Header,
        })
    }
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// A declared schema level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelInfo {
    /// Level number, 0 for the base specification.
    pub number: u32,
    /// Level name, e.g. `C2MS`.
    pub name: String,
    /// Free-text description.
    pub description: String,
}

/// One directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaTemplate {
    /// Schema ID this entry refines (`HEADER` for level header entries).
    pub id: String,
    /// Ordered field names whose values extend the ID.
    pub definitions: Vec<String>,
    /// Level the entry applies to.
    pub level: u32,
    /// Name of that level.
    pub level_name: String,
    /// Free-text description.
    pub description: String,
}

impl SchemaTemplate {
    /// True for a level's header definition.
    pub fn is_header(&self) -> bool {
        self.id == "HEADER"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn array(name: &str, size: &str, children: Vec<FieldTemplate>) -> FieldTemplate {
        FieldTemplate {
            mode: FieldMode::Control,
            kind: TemplateKind::Array {
                size_field: size.to_string(),
                index: "n".to_string(),
                optional: false,
            },
            children,
            ..FieldTemplate::new(name)
        }
    }

    fn container(name: &str, children: Vec<FieldTemplate>) -> FieldTemplate {
        FieldTemplate {
            mode: FieldMode::Control,
            kind: TemplateKind::Container { optional: true },
            children,
            ..FieldTemplate::new(name)
        }
    }

    fn template(fields: Vec<FieldTemplate>) -> MessageTemplate {
        MessageTemplate {
            schema_id: "REQ.DIR".to_string(),
            fq_id: "2019.00.C2MS.REQ.DIR".to_string(),
            level: 0,
            level_name: "C2MS".to_string(),
            kind: MessageKind::Request,
            description: String::new(),
            subject_elements: Vec::new(),
            header: "C2MS.HEADER".to_string(),
            fields,
        }
    }

    #[test]
    fn value_constraint_tokens() {
        assert_eq!(ValueConstraint::parse("5..10"), ValueConstraint::Range("5", "10"));
        assert_eq!(ValueConstraint::parse("-10..-5"), ValueConstraint::Range("-10", "-5"));
        assert_eq!(ValueConstraint::parse("5+"), ValueConstraint::AtLeast("5"));
        assert_eq!(ValueConstraint::parse("5-"), ValueConstraint::AtMost("5"));
        assert_eq!(ValueConstraint::parse("-5-"), ValueConstraint::AtMost("-5"));
        assert_eq!(ValueConstraint::parse("-5"), ValueConstraint::Exact("-5"));
        assert_eq!(ValueConstraint::parse("-"), ValueConstraint::Exact("-"));
        assert_eq!(ValueConstraint::parse("INFO"), ValueConstraint::Exact("INFO"));
    }

    #[test]
    fn explicit_value_requires_single_literal() {
        let mut t = FieldTemplate::new("MESSAGE-TYPE");
        t.values = vec!["MSG".to_string()];
        assert_eq!(t.explicit_value(), Some("MSG"));
        t.values = vec!["1..4".to_string()];
        assert_eq!(t.explicit_value(), None);
        t.values = vec!["A".to_string(), "B".to_string()];
        assert_eq!(t.explicit_value(), None);
    }

    #[test]
    fn substitutes_whole_segments_only() {
        assert_eq!(substitute_indices("ARGUMENT.n.NAME", &[("n", 3)]), "ARGUMENT.3.NAME");
        assert_eq!(substitute_indices("NUM-OF-n", &[("n", 3)]), "NUM-OF-n");
        assert_eq!(substitute_indices("A.n.B.m.C", &[("n", 1), ("m", 2)]), "A.1.B.2.C");
        assert_eq!(substitute_indices("A.n.B.n.C", &[("n", 2), ("n", 5)]), "A.2.B.5.C");
        assert_eq!(substitute_indices("A.n.NUM-OF-B", &[("n", 4)]), "A.4.NUM-OF-B");
    }

    #[test]
    fn find_field_through_arrays() {
        let t = template(vec![
            FieldTemplate::new("NUM-OF-ARGUMENTS"),
            array(
                "ARGUMENT",
                "NUM-OF-ARGUMENTS",
                vec![
                    FieldTemplate::new("ARGUMENT.n.NAME"),
                    array(
                        "ARGUMENT.n.ITEM",
                        "ARGUMENT.n.NUM-OF-ITEMS",
                        vec![FieldTemplate::new("ARGUMENT.n.ITEM.n.VALUE")],
                    ),
                ],
            ),
        ]);
        assert_eq!(t.find_field("ARGUMENT.2.NAME").unwrap().name, "ARGUMENT.n.NAME");
        assert_eq!(
            t.find_field("ARGUMENT.1.ITEM.4.VALUE").unwrap().name,
            "ARGUMENT.n.ITEM.n.VALUE"
        );
        assert!(t.find_field("ARGUMENT.0.NAME").is_none());
        assert!(t.find_field("ARGUMENT.X.NAME").is_none());
        assert!(t.find_field("ARGUMENT.n").is_none());
    }

    #[test]
    fn find_field_through_containers() {
        let t = template(vec![container(
            "PARAM",
            vec![FieldTemplate::new("NAME"), FieldTemplate::new("VALUE")],
        )]);
        assert_eq!(t.find_field("PARAM.1.NAME").unwrap().name, "NAME");
        assert_eq!(t.find_field("PARAM.12.VALUE").unwrap().name, "VALUE");
        assert!(t.find_field("PARAM.NAME").is_none());
        assert!(t.find_field("NAME").is_none());
    }

    #[test]
    fn binding_reports_declared_types() {
        let mut sev = FieldTemplate::new("SEVERITY");
        sev.types = vec![FieldType::I16];
        let mut head = FieldTemplate::new("MESSAGE-TYPE");
        head.class = FieldClass::Header;
        let t = template(vec![head, sev]);

        let decl = t.declaration("SEVERITY").unwrap();
        assert_eq!(decl.types, vec![FieldType::I16]);
        assert!(!decl.header);
        assert!(t.declaration("MESSAGE-TYPE").unwrap().header);
        assert!(t.declaration("MISSING").is_none());
    }

    #[test]
    fn type_list_renders_variable() {
        let mut t = FieldTemplate::new("X");
        assert_eq!(t.type_list(), "VARIABLE");
        t.types = vec![FieldType::I16, FieldType::U16];
        assert_eq!(t.type_list(), "I16,U16");
    }
}
