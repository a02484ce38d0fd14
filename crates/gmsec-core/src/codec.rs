//! # JSON Message Codec
//!
//! Encodes and decodes messages in the GMSEC JSON shape:
//!
//! ```json
//! {"MESSAGE": {"SUBJECT": "C2MS.X.Y", "KIND": "PUBLISH",
//!   "FIELD": [{"NAME": "SEVERITY", "TYPE": "I16", "VALUE": "2"}]}}
//! ```
//!
//! Values are written as strings; on input, JSON numbers and booleans are
//! accepted as well. Binary values travel as hex text. Header fields carry
//! `"HEAD": "T"`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MessageError;
use crate::field::{Field, FieldType, FieldValue};
use crate::message::{Message, MessageKind};

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    #[serde(rename = "MESSAGE")]
    message: WireMessage,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    #[serde(rename = "SUBJECT", default)]
    subject: String,
    #[serde(rename = "KIND", default)]
    kind: MessageKind,
    #[serde(rename = "FIELD", default)]
    fields: Vec<WireField>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireField {
    #[serde(rename = "NAME")]
    name: String,
    #[serde(rename = "TYPE")]
    ty: FieldType,
    #[serde(rename = "VALUE")]
    value: Value,
    #[serde(rename = "HEAD", default, skip_serializing_if = "Option::is_none")]
    head: Option<String>,
}

impl Message {
    /// Encode as GMSEC JSON.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, MessageError> {
        let fields = self
            .fields()
            .map(|f| WireField {
                name: f.name().to_string(),
                ty: f.field_type(),
                value: Value::String(f.value().to_value_string()),
                head: f.is_header().then(|| "T".to_string()),
            })
            .collect();
        let envelope = Envelope {
            message: WireMessage {
                subject: self.subject().to_string(),
                kind: self.kind(),
                fields,
            },
        };
        Ok(serde_json::to_string_pretty(&envelope)?)
    }

    /// Decode GMSEC JSON.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::Json`] for malformed JSON,
    /// [`MessageError::Decode`] for values of an unsupported JSON shape, and
    /// [`MessageError::Field`] for values that do not fit their declared type.
    pub fn from_json(text: &str) -> Result<Message, MessageError> {
        let envelope: Envelope = serde_json::from_str(text)?;
        let wire = envelope.message;
        let mut msg = Message::new(wire.subject, wire.kind);
        for wf in wire.fields {
            let text = match &wf.value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => {
                    return Err(MessageError::Decode(format!(
                        "field {} has unsupported JSON value {other}",
                        wf.name
                    )))
                }
            };
            let value = FieldValue::from_text(wf.ty, &text, &wf.name)?;
            let header = matches!(wf.head.as_deref(), Some("T" | "t" | "true" | "TRUE"));
            msg.add_field(Field::new(wf.name, value)?.with_header(header));
        }
        Ok(msg)
    }
}
