//! # Specification Errors
//!
//! Load-time errors ([`SchemaLoadError`]) are fatal for the `Specification`
//! being built: the loader returns before any table is published, so no
//! partially-initialized instance exists. Validate-time errors are
//! recoverable: the message is rejected and the engine stays usable.
//!
//! Every [`SpecificationError`] carries an error class tag and a stable
//! numeric code alongside its human-readable message.

use std::fmt;

use gmsec_core::{ConfigError, FieldError, MessageError};
use thiserror::Error;

use crate::validate::ValidationViolations;

/// Stable numeric codes reported by [`SpecificationError::code`].
pub mod error_codes {
    /// Schema source could not be loaded.
    pub const SCHEMA_LOAD_FAILED: u32 = 100;
    /// No template matches the message at any configured level.
    pub const SCHEMA_NOT_FOUND: u32 = 101;
    /// One or more field-level violations.
    pub const MESSAGE_VALIDATION_FAILED: u32 = 200;
    /// A user-registered validator rejected the message or panicked.
    pub const CUSTOM_VALIDATION_FAILED: u32 = 201;
    /// Configuration value rejected.
    pub const INVALID_CONFIG_VALUE: u32 = 300;
    /// Field value conversion failed.
    pub const FIELD_CONVERSION_FAILED: u32 = 400;
    /// Encoded message could not be decoded.
    pub const MESSAGE_DECODE_FAILED: u32 = 401;
}

/// Error class tag, the coarse category of a [`SpecificationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Schema loading or lookup.
    Specification,
    /// Message content validation.
    MessageValidation,
    /// User-registered validator.
    CustomValidation,
    /// Configuration.
    Config,
    /// Field construction or conversion.
    Field,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorClass::Specification => "specification error",
            ErrorClass::MessageValidation => "message validation error",
            ErrorClass::CustomValidation => "custom validation error",
            ErrorClass::Config => "configuration error",
            ErrorClass::Field => "field error",
        })
    }
}

/// A structural defect in a schema source, naming the offending file.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaLoadError {
    /// The file could not be read.
    #[error("{file}: cannot read schema file: {reason}")]
    Io {
        /// File or directory that failed.
        file: String,
        /// Underlying reason.
        reason: String,
    },

    /// The file is not well-formed markup.
    #[error("{file}: unparseable markup: {reason}")]
    Markup {
        /// Offending file.
        file: String,
        /// Parser message.
        reason: String,
    },

    /// A required element is missing.
    #[error("{file}: missing required <{tag}> element")]
    MissingTag {
        /// Offending file.
        file: String,
        /// The missing element.
        tag: String,
    },

    /// A required attribute is missing.
    #[error("{file}: <{element}> is missing required attribute {attribute}")]
    MissingAttribute {
        /// Offending file.
        file: String,
        /// Element lacking the attribute.
        element: String,
        /// The missing attribute.
        attribute: String,
    },

    /// An attribute value is not acceptable.
    #[error("{file}: <{element}> has invalid {attribute}=\"{value}\"")]
    InvalidAttribute {
        /// Offending file.
        file: String,
        /// Element carrying the attribute.
        element: String,
        /// Attribute name.
        attribute: String,
        /// Rejected value.
        value: String,
    },

    /// The same Schema ID is defined twice.
    #[error("{file}: duplicate schema ID {id}")]
    DuplicateSchemaId {
        /// File holding the second definition.
        file: String,
        /// The duplicated ID.
        id: String,
    },

    /// A simple-type reference could not be resolved in the file or its includes.
    #[error("{file}: unresolved type reference {type_name}")]
    UnresolvedType {
        /// File holding the reference.
        file: String,
        /// The unresolved type name.
        type_name: String,
    },

    /// A reference to a header, level, or included document does not resolve.
    #[error("{file}: dangling reference to {reference}")]
    DanglingReference {
        /// File holding the reference.
        file: String,
        /// What was referenced.
        reference: String,
    },

    /// A configured schema level has no (or more than one) HEADER definition.
    #[error("{file}: schema level {level} must define exactly one HEADER")]
    MissingHeader {
        /// Directory or header file.
        file: String,
        /// The affected level.
        level: u32,
    },

    /// A configured schema level is not declared in the directory.
    #[error("{file}: schema level {level} is not declared")]
    MissingLevel {
        /// Directory file.
        file: String,
        /// The undeclared level.
        level: u32,
    },

    /// An ARRAY-START control has no matching ARRAY-END (or vice versa).
    #[error("{file}: unbalanced array control for {name}")]
    UnbalancedArray {
        /// Offending file.
        file: String,
        /// Array name.
        name: String,
    },
}

/// Top-level error type for the specification engine.
#[derive(Error, Debug)]
pub enum SpecificationError {
    /// Schema source could not be loaded.
    #[error("schema load error: {0}")]
    SchemaLoad(#[from] SchemaLoadError),

    /// No template matches the message.
    #[error("cannot resolve schema ID for message with subject \"{subject}\": {reason}")]
    SchemaNotFound {
        /// Subject of the message.
        subject: String,
        /// Why resolution failed.
        reason: String,
    },

    /// No template is registered under the requested Schema ID.
    #[error("no message template named {0}")]
    UnknownTemplate(String),

    /// The message violates its template.
    #[error("message validation failed for {schema_id}:\n{violations}")]
    ValidationFailed {
        /// Schema ID the message was validated against.
        schema_id: String,
        /// Every violation found in the pass.
        violations: ValidationViolations,
    },

    /// A user-registered validator rejected the message.
    #[error("custom validator rejected message: {0}")]
    CustomValidator(String),

    /// Configuration value rejected.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Field conversion failed.
    #[error("field error: {0}")]
    Field(#[from] FieldError),

    /// Encoded message rejected.
    #[error("message error: {0}")]
    Message(#[from] MessageError),
}

impl SpecificationError {
    /// Error class tag.
    pub fn class(&self) -> ErrorClass {
        match self {
            SpecificationError::SchemaLoad(_)
            | SpecificationError::SchemaNotFound { .. }
            | SpecificationError::UnknownTemplate(_) => ErrorClass::Specification,
            SpecificationError::ValidationFailed { .. } => ErrorClass::MessageValidation,
            SpecificationError::CustomValidator(_) => ErrorClass::CustomValidation,
            SpecificationError::Config(_) => ErrorClass::Config,
            SpecificationError::Field(_) | SpecificationError::Message(_) => ErrorClass::Field,
        }
    }

    /// Stable numeric code; see [`error_codes`].
    pub fn code(&self) -> u32 {
        match self {
            SpecificationError::SchemaLoad(_) => error_codes::SCHEMA_LOAD_FAILED,
            SpecificationError::SchemaNotFound { .. } | SpecificationError::UnknownTemplate(_) => {
                error_codes::SCHEMA_NOT_FOUND
            }
            SpecificationError::ValidationFailed { .. } => error_codes::MESSAGE_VALIDATION_FAILED,
            SpecificationError::CustomValidator(_) => error_codes::CUSTOM_VALIDATION_FAILED,
            SpecificationError::Config(_) => error_codes::INVALID_CONFIG_VALUE,
            SpecificationError::Field(_) => error_codes::FIELD_CONVERSION_FAILED,
            SpecificationError::Message(_) => error_codes::MESSAGE_DECODE_FAILED,
        }
    }

    /// Violations, if this is a validation failure.
    pub fn violations(&self) -> Option<&ValidationViolations> {
        match self {
            SpecificationError::ValidationFailed { violations, .. } => Some(violations),
            _ => None,
        }
    }
}
