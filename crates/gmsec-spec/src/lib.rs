#![deny(missing_docs)]

//! # gmsec-spec: Message Specification & Validation Engine
//!
//! Loads a layered message specification (a directory of levels plus one
//! template per message kind, in the legacy XML or the XSD dialect),
//! classifies messages into Schema IDs, and validates them against their
//! templates.
//!
//! ## Layering
//!
//! Schema levels are stacked: level 0 is the base standard (C2MS), higher
//! levels add organization-specific templates. Resolution walks from the
//! configured ceiling down and takes the first level with a match.
//!
//! ## Crate Structure
//!
//! - [`loader`]: schema sources and the two markup dialects.
//! - [`tables`]: the immutable, published result of a load.
//! - [`resolve`] and [`registry`]: Schema ID classification and its cache.
//! - [`validate`]: field-by-field comparison at a [`ValidationLevel`].
//! - [`tracking`]: reserved tracking-field policy on publish.
//! - [`factory`]: template-bound message construction and subjects.
//! - [`specification`]: the [`Specification`] facade tying these together.

pub mod config;
pub mod error;
pub mod factory;
pub mod loader;
pub mod registry;
pub mod resolve;
pub mod specification;
pub mod tables;
pub mod template;
pub mod tracking;
pub mod validate;

pub use config::{SpecVersion, SpecificationConfig, ValidationLevel, DEFAULT_VERSION};
pub use error::{error_codes, ErrorClass, SchemaLoadError, SpecificationError};
pub use loader::{DirectorySource, MemorySource, SchemaLoader, SchemaSource};
pub use registry::SchemaRegistry;
pub use specification::{MessageValidator, Specification};
pub use tables::TemplateTables;
pub use template::{
    FieldClass, FieldDependency, FieldMode, FieldTemplate, LevelInfo, MessageTemplate,
    SchemaTemplate, TemplateKind, ValueConstraint,
};
pub use tracking::{TrackingConcern, TrackingPolicy};
pub use validate::{ValidationEngine, ValidationViolations, Violation, ViolationKind};
