//! # Schema ID Resolution
//!
//! Classifies a message by walking schema levels from the ceiling down:
//!
//! 1. The level's HEADER directory entry names the definition fields
//!    (typically MESSAGE-TYPE, MESSAGE-SUBTYPE). Their values joined with
//!    `.` form the candidate ID. A missing definition field is fatal.
//! 2. While a directory entry at this level matches the candidate and the
//!    message has values for all of its definition fields, those values are
//!    appended. A missing field here only stops refinement.
//! 3. If a template exists for the candidate at this level, its
//!    fully-qualified ID is the result; otherwise the next level down is
//!    tried.

use gmsec_core::Message;
use tracing::{debug, trace};

use crate::error::SpecificationError;
use crate::tables::TemplateTables;

/// Resolve the fully-qualified Schema ID for `message`, without caching.
///
/// # Errors
///
/// Returns [`SpecificationError::SchemaNotFound`] if a header definition
/// field is missing or no level has a matching template.
pub fn resolve_schema_id(tables: &TemplateTables, message: &Message) -> Result<String, SpecificationError> {
    let not_found = |reason: String| SpecificationError::SchemaNotFound {
        subject: message.subject().to_string(),
        reason,
    };

    for level in (0..=tables.ceiling()).rev() {
        let header = tables
            .header_schema(level)
            .ok_or_else(|| not_found(format!("no HEADER definition at schema level {level}")))?;

        let mut parts = Vec::with_capacity(header.definitions.len());
        for name in &header.definitions {
            let value = message
                .string_value(name)
                .ok_or_else(|| not_found(format!("message is missing {name}, needed to classify it")))?;
            parts.push(value);
        }
        let mut candidate = parts.join(".");

        while let Some(entry) = tables.directory_entry(&candidate, level) {
            if entry.definitions.is_empty() {
                break;
            }
            let refinement: Option<Vec<String>> =
                entry.definitions.iter().map(|d| message.string_value(d)).collect();
            match refinement {
                Some(values) => candidate = format!("{candidate}.{}", values.join(".")),
                None => break,
            }
        }

        if let Some(fq_id) = tables.qualify(level, &candidate) {
            if tables.template_fq(&fq_id).is_some() {
                trace!(subject = message.subject(), %fq_id, "schema ID resolved");
                return Ok(fq_id);
            }
        }
        debug!(level, candidate = %candidate, "no template at this schema level; trying lower level");
    }

    Err(not_found("no template matches at any configured schema level".to_string()))
}
