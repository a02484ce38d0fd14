//! # Error Hierarchy
//!
//! Structured error types for the GMSEC core types, built with `thiserror`.
//! No `Box<dyn Error>`, no `.unwrap()` outside tests.
//!
//! Field coercion failures are local, single-field failures and carry the
//! field name, the source representation, and the requested type so that a
//! caller can act on them without re-running the conversion.

use thiserror::Error;

use crate::field::FieldType;

/// Top-level error type for the core crate.
#[derive(Error, Debug)]
pub enum GmsecError {
    /// Typed field construction or coercion failed.
    #[error("field error: {0}")]
    Field(#[from] FieldError),

    /// Configuration value could not be interpreted.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Message could not be decoded or encoded.
    #[error("message error: {0}")]
    Message(#[from] MessageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while building or coercing a single field.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    /// The source value cannot be represented as the requested type at all.
    #[error("cannot convert field {field} from {from} \"{value}\" to {to}: {reason}")]
    InvalidTypeConversion {
        /// Name of the field being set.
        field: String,
        /// Type of the caller-supplied value.
        from: FieldType,
        /// Rendering of the caller-supplied value.
        value: String,
        /// Type declared by the template.
        to: FieldType,
        /// Why the conversion was rejected.
        reason: String,
    },

    /// The source value is of a convertible kind but does not fit the target width.
    #[error("value {value} for field {field} is out of range for {to}")]
    ValueOutOfRange {
        /// Name of the field being set.
        field: String,
        /// Rendering of the caller-supplied value.
        value: String,
        /// Type declared by the template.
        to: FieldType,
    },

    /// Field names must be non-empty and free of whitespace.
    #[error("invalid field name: \"{0}\"")]
    InvalidFieldName(String),
}

/// Errors interpreting configuration values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A recognized key carries a value of the wrong shape.
    #[error("invalid value \"{value}\" for {key} (expected {expected})")]
    InvalidValue {
        /// The configuration key.
        key: String,
        /// The offending value.
        value: String,
        /// Description of the accepted values.
        expected: String,
    },

    /// A configuration document could not be parsed.
    #[error("cannot parse configuration: {0}")]
    Parse(String),
}

/// Errors decoding or encoding a message.
#[derive(Error, Debug)]
pub enum MessageError {
    /// The encoded message is structurally wrong.
    #[error("cannot decode message: {0}")]
    Decode(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A field inside the encoded message was rejected.
    #[error("invalid field in message: {0}")]
    Field(#[from] FieldError),
}
