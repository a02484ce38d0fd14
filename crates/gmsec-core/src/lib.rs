#![deny(missing_docs)]

//! # gmsec-core: Foundational Types for the GMSEC Message Bus
//!
//! This crate defines the message model that every other crate in the
//! workspace builds on. It has no internal crate dependencies.
//!
//! ## Design Principles
//!
//! 1. **One tagged union for field values.** [`FieldValue`] covers every
//!    scalar kind carried on the bus; type dispatch is an exhaustive `match`.
//!
//! 2. **No silent narrowing.** [`FieldValue::coerce_to`] range-checks every
//!    integer conversion and reports [`FieldError::ValueOutOfRange`] rather
//!    than truncating or wrapping.
//!
//! 3. **Templates are a seam, not a dependency.** A [`Message`] consults a
//!    [`TemplateBinding`] for declared field types; the specification crate
//!    supplies the implementation.
//!
//! 4. **Structured errors.** `thiserror` enums throughout, no `.unwrap()`
//!    outside tests.

pub mod codec;
pub mod coercion;
pub mod config;
pub mod content;
pub mod error;
pub mod field;
pub mod message;
pub mod temporal;

// Re-export primary types at crate root for ergonomic imports.
pub use config::{keys, Config, TriState};
pub use content::ContentPattern;
pub use error::{ConfigError, FieldError, GmsecError, MessageError};
pub use field::{Field, FieldType, FieldValue};
pub use message::{FieldDeclaration, Message, MessageKind, TemplateBinding};
pub use temporal::GmsecTime;
