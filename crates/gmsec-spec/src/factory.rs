//! # Message Factory
//!
//! Template-bound message construction and subject rendering.
//!
//! Subject elements are either field names, rendered from the message's
//! values, literal tokens (e.g. `C2MS`), or `FILL` for free segments.

use std::sync::Arc;

use gmsec_core::{FieldError, FieldType, FieldValue, Message, MessageKind, TemplateBinding};

use crate::template::MessageTemplate;

/// Placeholder segment for unset subject elements.
pub const FILL: &str = "FILL";

/// Subject element replaced by `RESP` in response topics.
const MESSAGE_TYPE: &str = "MESSAGE-TYPE";

impl MessageTemplate {
    /// Render the subject for `message`; unset fields become `FILL`.
    pub fn build_subject(&self, message: &Message) -> String {
        self.subject_elements
            .iter()
            .map(|e| match self.element(e, message) {
                Element::Fill | Element::Unset => FILL.to_string(),
                Element::Text(text) => text,
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Subscription pattern matching replies to `message`: MESSAGE-TYPE
    /// becomes `RESP`, free or unset elements become `+`, and `.>` is
    /// appended.
    pub fn response_topic(&self, message: &Message) -> String {
        let mut topic = String::new();
        for (i, element) in self.subject_elements.iter().enumerate() {
            if i > 0 {
                topic.push('.');
            }
            if element == MESSAGE_TYPE {
                topic.push_str("RESP");
                continue;
            }
            match self.element(element, message) {
                Element::Fill | Element::Unset => topic.push('+'),
                Element::Text(text) => topic.push_str(&text),
            }
        }
        if topic.is_empty() {
            ">".to_string()
        } else {
            topic.push_str(".>");
            topic
        }
    }

    fn element(&self, token: &str, message: &Message) -> Element {
        if token == FILL {
            return Element::Fill;
        }
        if self.find_field(token).is_none() {
            return Element::Text(token.to_string());
        }
        match message.string_value(token) {
            Some(value) if !value.is_empty() => Element::Text(value),
            _ => Element::Unset,
        }
    }
}

enum Element {
    Fill,
    Unset,
    Text(String),
}

/// New message bound to `template`, with every explicitly-valued top-level
/// field pre-populated and, for requests, a response topic.
///
/// # Errors
///
/// Returns [`FieldError`] if an explicit value does not fit its declared type.
pub fn create_message(template: &Arc<MessageTemplate>) -> Result<Message, FieldError> {
    let binding: Arc<dyn TemplateBinding> = template.clone();
    let mut message = Message::with_template(template.kind, binding);

    for field in template.fields.iter().filter(|f| !f.is_control()) {
        if let Some(text) = field.explicit_value() {
            let ty = field.types.first().copied().unwrap_or(FieldType::String);
            let value = FieldValue::from_text(ty, text, &field.name)?;
            message.set_field_value(&field.name, value)?;
        }
    }

    if !template.subject_elements.is_empty() {
        message.set_subject(template.build_subject(&message));
    }
    if template.kind == MessageKind::Request {
        message.set_response_topic(Some(template.response_topic(&message)));
    }
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{FieldClass, FieldTemplate};

    fn fixed(name: &str, value: &str, ty: Option<FieldType>) -> FieldTemplate {
        FieldTemplate {
            class: FieldClass::Header,
            types: ty.into_iter().collect(),
            values: vec![value.to_string()],
            ..FieldTemplate::new(name)
        }
    }

    fn request() -> Arc<MessageTemplate> {
        Arc::new(MessageTemplate {
            schema_id: "REQ.DIR".to_string(),
            fq_id: "2019.00.C2MS.REQ.DIR".to_string(),
            level: 0,
            level_name: "C2MS".to_string(),
            kind: MessageKind::Request,
            description: String::new(),
            subject_elements: ["C2MS", "MISSION-ID", "MESSAGE-TYPE", "MESSAGE-SUBTYPE", "FILL"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            header: "C2MS.HEADER".to_string(),
            fields: vec![
                FieldTemplate::new("MISSION-ID"),
                fixed("MESSAGE-TYPE", "REQ", Some(FieldType::String)),
                fixed("MESSAGE-SUBTYPE", "DIR", None),
                fixed("CONTENT-VERSION", "2019", Some(FieldType::F32)),
                FieldTemplate {
                    values: vec!["1..5".to_string()],
                    ..FieldTemplate::new("PRIORITY")
                },
            ],
        })
    }

    #[test]
    fn prepopulates_explicit_values() {
        let msg = create_message(&request()).unwrap();
        assert_eq!(msg.kind(), MessageKind::Request);
        assert_eq!(msg.schema_id(), Some("2019.00.C2MS.REQ.DIR"));
        assert_eq!(msg.string_value("MESSAGE-TYPE").as_deref(), Some("REQ"));
        assert_eq!(msg.get_field("CONTENT-VERSION").unwrap().value(), &FieldValue::F32(2019.0));
        assert!(msg.get_field("MESSAGE-SUBTYPE").unwrap().is_header());
        assert!(!msg.has_field("PRIORITY"));
    }

    #[test]
    fn subject_uses_fill_for_unset_fields() {
        let mut msg = create_message(&request()).unwrap();
        assert_eq!(msg.subject(), "C2MS.FILL.REQ.DIR.FILL");
        msg.set_field_value("MISSION-ID", "SAT1").unwrap();
        assert_eq!(request().build_subject(&msg), "C2MS.SAT1.REQ.DIR.FILL");
    }

    #[test]
    fn response_topic_for_requests() {
        let msg = create_message(&request()).unwrap();
        assert_eq!(msg.response_topic(), Some("C2MS.+.RESP.DIR.+.>"));
    }
}
