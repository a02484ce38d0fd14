//! # Messages
//!
//! A [`Message`] is a subject, a kind, and a collection of uniquely-named
//! fields. Messages created from a known message template keep a
//! [`TemplateBinding`] so that [`Message::set_field_value`] can coerce
//! caller-supplied values to the type the template declares.
//!
//! Field names are case-sensitive and unique; adding a field whose name is
//! already present replaces the existing field.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::FieldError;
use crate::field::{Field, FieldType, FieldValue};

/// The role of a message on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageKind {
    /// Fire-and-forget publication.
    #[default]
    Publish,
    /// Request expecting a reply.
    Request,
    /// Reply to a request.
    Reply,
}

impl MessageKind {
    /// Canonical kind token.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Publish => "PUBLISH",
            MessageKind::Request => "REQUEST",
            MessageKind::Reply => "REPLY",
        }
    }

    /// Parse a kind token, case-insensitively.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "PUBLISH" => Some(MessageKind::Publish),
            "REQUEST" => Some(MessageKind::Request),
            "REPLY" => Some(MessageKind::Reply),
            _ => None,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a bound template declares about one field name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldDeclaration {
    /// Allowed types; empty means any type is acceptable.
    pub types: Vec<FieldType>,
    /// Whether the field belongs to the message header.
    pub header: bool,
}

/// The seam between a message and the template it was created from.
///
/// Implemented by the specification crate's message templates; the core
/// crate only needs to ask what a field name is declared as.
pub trait TemplateBinding: Send + Sync + fmt::Debug {
    /// Schema ID of the bound template, as precise as the implementation
    /// can make it (fully-qualified for loaded specifications).
    fn schema_id(&self) -> &str;

    /// Declaration for `field_name`, with array indices already substituted
    /// (e.g. `ARGUMENT.2.NAME`). `None` if the template does not name it.
    fn declaration(&self, field_name: &str) -> Option<FieldDeclaration>;
}

/// A GMSEC message.
#[derive(Debug, Clone, Default)]
pub struct Message {
    subject: String,
    kind: MessageKind,
    fields: BTreeMap<String, Field>,
    template: Option<Arc<dyn TemplateBinding>>,
    config: Config,
    response_topic: Option<String>,
}

impl Message {
    /// Create an empty message of the given kind.
    pub fn new(subject: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            subject: subject.into(),
            kind,
            ..Self::default()
        }
    }

    /// Create an empty message bound to a template.
    pub fn with_template(kind: MessageKind, template: Arc<dyn TemplateBinding>) -> Self {
        Self {
            kind,
            template: Some(template),
            ..Self::default()
        }
    }

    /// Message subject.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Replace the subject.
    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.subject = subject.into();
    }

    /// Message kind.
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Replace the kind.
    pub fn set_kind(&mut self, kind: MessageKind) {
        self.kind = kind;
    }

    /// Message-scoped configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replace the message-scoped configuration.
    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    /// Bound template, if the message was created from one.
    pub fn template(&self) -> Option<&Arc<dyn TemplateBinding>> {
        self.template.as_ref()
    }

    /// Schema ID of the bound template.
    pub fn schema_id(&self) -> Option<&str> {
        self.template.as_ref().map(|t| t.schema_id())
    }

    /// Response topic pattern for request messages.
    pub fn response_topic(&self) -> Option<&str> {
        self.response_topic.as_deref()
    }

    /// Set the response topic pattern.
    pub fn set_response_topic(&mut self, topic: Option<String>) {
        self.response_topic = topic;
    }

    // -----------------------------------------------------------------------
    // Field store
    // -----------------------------------------------------------------------

    /// Add a field. Returns `true` if a field with the same name was replaced.
    pub fn add_field(&mut self, field: Field) -> bool {
        self.fields.insert(field.name().to_string(), field).is_some()
    }

    /// Look up a field by exact name.
    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// True if a field with this name is present.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Remove a field. Returns `true` if it was present.
    pub fn remove_field(&mut self, name: &str) -> bool {
        self.fields.remove(name).is_some()
    }

    /// Remove all fields.
    pub fn clear_fields(&mut self) {
        self.fields.clear();
    }

    /// Iterate fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    /// Number of fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Integer value of a field, if present and integer-typed.
    pub fn integer_value(&self, name: &str) -> Option<i64> {
        self.get_field(name).and_then(|f| f.value().as_i64())
    }

    /// Textual rendering of a field's value, if present.
    pub fn string_value(&self, name: &str) -> Option<String> {
        self.get_field(name).map(|f| f.value().to_value_string())
    }

    /// Set a field from a loosely-typed value, consulting the bound template.
    ///
    /// With no template, or when the template declares no concrete type for
    /// `name`, the value is stored with its own type. Otherwise it is
    /// coerced to the declared type (the first declared type when several
    /// are allowed and the value's own type is not among them). The header
    /// flag follows the template's field class.
    ///
    /// Returns `true` if an existing field was replaced.
    ///
    /// # Errors
    ///
    /// Propagates [`FieldError`] from name validation and coercion.
    pub fn set_field_value(
        &mut self,
        name: &str,
        value: impl Into<FieldValue>,
    ) -> Result<bool, FieldError> {
        let value = value.into();
        let declaration = self
            .template
            .as_ref()
            .and_then(|t| t.declaration(name))
            .unwrap_or_default();

        let value = match declaration.types.first() {
            Some(_) if declaration.types.contains(&value.field_type()) => value,
            Some(&target) => value.coerce_to(target, name)?,
            None => value,
        };

        let field = Field::new(name, value)?.with_header(declaration.header);
        Ok(self.add_field(field))
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} [", self.kind, self.subject)?;
        for (i, field) in self.fields.values().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{field}")?;
        }
        f.write_str("]")
    }
}
