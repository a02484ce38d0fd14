//! # Specification
//!
//! The entry point: owns one published [`TemplateTables`] snapshot, the
//! subject registry, and an optional user validator.
//!
//! ## Concurrency
//!
//! Loading builds a complete table before anything is published. The
//! snapshot sits behind an `RwLock<Arc<_>>`: readers clone the `Arc` and
//! release the lock at once, so validation never holds a lock while it
//! walks templates. A version switch swaps the `Arc` and clears the
//! registry. Any number of threads may validate concurrently.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use gmsec_core::{keys, Config, ConfigError, Message};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::config::{SpecVersion, SpecificationConfig, ValidationLevel};
use crate::error::SpecificationError;
use crate::factory;
use crate::loader::{DirectorySource, SchemaLoader, SchemaSource};
use crate::registry::SchemaRegistry;
use crate::resolve::resolve_schema_id;
use crate::tables::TemplateTables;
use crate::template::{FieldTemplate, MessageTemplate, SchemaTemplate};
use crate::tracking::TrackingPolicy;
use crate::validate::ValidationEngine;

// ---------------------------------------------------------------------------
// Custom validators
// ---------------------------------------------------------------------------

/// User-supplied validation run after built-in validation succeeds.
///
/// Returning `Err` rejects the message with the given reason. A panicking
/// validator is caught and reported the same way.
pub trait MessageValidator: Send + Sync {
    /// Accept or reject `message`.
    fn validate(&self, message: &Message) -> Result<(), String>;
}

impl<F> MessageValidator for F
where
    F: Fn(&Message) -> Result<(), String> + Send + Sync,
{
    fn validate(&self, message: &Message) -> Result<(), String> {
        self(message)
    }
}

// ---------------------------------------------------------------------------
// Specification
// ---------------------------------------------------------------------------

/// Loaded message specification and validation entry points.
pub struct Specification {
    config: SpecificationConfig,
    tables: RwLock<Arc<TemplateTables>>,
    registry: SchemaRegistry,
    validator: RwLock<Option<Arc<dyn MessageValidator>>>,
}

impl Specification {
    /// Load the specification described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SpecificationError::Config`] for bad settings (including a
    /// missing schema path) and [`SpecificationError::SchemaLoad`] if the
    /// schema tree is malformed.
    pub fn new(config: &Config) -> Result<Self, SpecificationError> {
        Self::with_config(SpecificationConfig::from_config(config)?)
    }

    /// Load from the filesystem per an already-parsed configuration.
    ///
    /// # Errors
    ///
    /// As [`Specification::new`].
    pub fn with_config(config: SpecificationConfig) -> Result<Self, SpecificationError> {
        let root = config.schema_path.clone().ok_or_else(missing_schema_path)?;
        let source = DirectorySource::for_version(&root, &config.version);
        Self::from_source(config, &source)
    }

    /// Load from an arbitrary source.
    ///
    /// # Errors
    ///
    /// Returns [`SpecificationError::SchemaLoad`] if the source is malformed.
    pub fn from_source(
        config: SpecificationConfig,
        source: &dyn SchemaSource,
    ) -> Result<Self, SpecificationError> {
        let tables = SchemaLoader::from_config(&config).load(source)?;
        Ok(Self {
            config,
            tables: RwLock::new(Arc::new(tables)),
            registry: SchemaRegistry::new(),
            validator: RwLock::new(None),
        })
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    /// Settings this instance was created with.
    pub fn config(&self) -> &SpecificationConfig {
        &self.config
    }

    /// Current table snapshot.
    pub fn tables(&self) -> Arc<TemplateTables> {
        Arc::clone(&self.tables.read())
    }

    /// Loaded specification version.
    pub fn version(&self) -> SpecVersion {
        self.tables().version().clone()
    }

    /// Effective schema level ceiling.
    pub fn schema_level(&self) -> u32 {
        self.tables().ceiling()
    }

    /// Enforcement level.
    pub fn validation_level(&self) -> ValidationLevel {
        self.config.validation_level
    }

    /// Subject registry.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Shorthand IDs of every loaded template, sorted.
    pub fn template_ids(&self) -> Vec<String> {
        self.tables().template_ids().map(str::to_string).collect()
    }

    /// Template by fully-qualified or shorthand ID.
    pub fn template(&self, id: &str) -> Option<Arc<MessageTemplate>> {
        self.tables().template(id).cloned()
    }

    /// Header field list by key (`C2MS.HEADER`, `DEFAULT`, ...).
    pub fn header_fields(&self, key: &str) -> Option<Vec<FieldTemplate>> {
        self.tables().header_fields(key).map(<[_]>::to_vec)
    }

    /// Directory entries up to the ceiling.
    pub fn directory(&self) -> Vec<SchemaTemplate> {
        self.tables().directory().to_vec()
    }

    // -----------------------------------------------------------------------
    // Version switch
    // -----------------------------------------------------------------------

    /// Load another version from the configured schema path and publish it.
    ///
    /// # Errors
    ///
    /// On any error the current snapshot stays in place.
    pub fn switch_version(&self, version: &str) -> Result<(), SpecificationError> {
        let version = SpecVersion::parse(version)?;
        let root = self.config.schema_path.clone().ok_or_else(missing_schema_path)?;
        let source = DirectorySource::for_version(&root, &version);
        self.switch_version_from(version, &source)
    }

    /// Load another version from `source` and publish it, clearing the
    /// registry.
    ///
    /// # Errors
    ///
    /// On any error the current snapshot stays in place.
    pub fn switch_version_from(
        &self,
        version: SpecVersion,
        source: &dyn SchemaSource,
    ) -> Result<(), SpecificationError> {
        let loader = SchemaLoader::new(
            version,
            self.config.schema_level,
            self.config.legacy_schema_files,
        );
        let tables = Arc::new(loader.load(source)?);
        info!(version = %tables.version(), "switching specification version");
        *self.tables.write() = tables;
        self.registry.clear();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    /// Fully-qualified Schema ID of `message`, from its bound template or
    /// by cached resolution.
    ///
    /// # Errors
    ///
    /// Returns [`SpecificationError::SchemaNotFound`] if it cannot be
    /// classified.
    pub fn lookup_schema_id(&self, message: &Message) -> Result<String, SpecificationError> {
        self.lookup_in(&self.tables(), message)
    }

    /// Template `message` validates against.
    ///
    /// # Errors
    ///
    /// As [`Specification::lookup_schema_id`].
    pub fn template_for(&self, message: &Message) -> Result<Arc<MessageTemplate>, SpecificationError> {
        let tables = self.tables();
        let id = self.lookup_in(&tables, message)?;
        tables
            .template_fq(&id)
            .cloned()
            .ok_or_else(|| SpecificationError::UnknownTemplate(id))
    }

    fn lookup_in(&self, tables: &TemplateTables, message: &Message) -> Result<String, SpecificationError> {
        if let Some(template) = message.schema_id().and_then(|id| tables.template(id)) {
            return Ok(template.fq_id.clone());
        }

        let subject = message.subject();
        let id = self
            .registry
            .get_or_resolve(subject, || resolve_schema_id(tables, message))?;
        if tables.template_fq(&id).is_some() {
            return Ok(id);
        }

        // Cached before a version switch completed.
        debug!(subject, stale = %id, "registry entry not in current tables; resolving again");
        let id = resolve_schema_id(tables, message)?;
        if !subject.is_empty() {
            self.registry.insert(subject, id.clone());
        }
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Validate `message` at the configured level, then run the custom
    /// validator.
    ///
    /// # Errors
    ///
    /// [`SpecificationError::SchemaNotFound`],
    /// [`SpecificationError::ValidationFailed`] with every violation, or
    /// [`SpecificationError::CustomValidator`].
    pub fn validate_message(&self, message: &Message) -> Result<(), SpecificationError> {
        self.validate(message, None)
    }

    /// As [`Specification::validate_message`], additionally enforcing the
    /// tracking policy formed from the message's config and `connection`.
    ///
    /// # Errors
    ///
    /// As [`Specification::validate_message`]; reserved-field violations are
    /// reported in the same aggregated error.
    pub fn validate_for_publish(&self, message: &Message, connection: &Config) -> Result<(), SpecificationError> {
        self.validate(message, Some(connection))
    }

    /// Send-path hook: validates for publish when content validation on
    /// send is enabled, otherwise accepts.
    ///
    /// # Errors
    ///
    /// As [`Specification::validate_for_publish`].
    pub fn validate_on_send(&self, message: &Message, connection: &Config) -> Result<(), SpecificationError> {
        if !self.config.validate_send {
            return Ok(());
        }
        self.validate_for_publish(message, connection)
    }

    /// Receive-path hook: validates when content validation on receive is
    /// enabled, otherwise accepts.
    ///
    /// # Errors
    ///
    /// As [`Specification::validate_message`].
    pub fn validate_on_receive(&self, message: &Message) -> Result<(), SpecificationError> {
        if !self.config.validate_recv {
            return Ok(());
        }
        self.validate_message(message)
    }

    fn validate(&self, message: &Message, publishing: Option<&Config>) -> Result<(), SpecificationError> {
        let level = self.config.validation_level;
        if level != ValidationLevel::NoEnforcement {
            let tables = self.tables();
            let schema_id = self.lookup_in(&tables, message)?;
            let template = tables
                .template_fq(&schema_id)
                .ok_or_else(|| SpecificationError::UnknownTemplate(schema_id.clone()))?;

            let mut violations = ValidationEngine::new(level).compare(template, message);
            if let Some(connection) = publishing {
                let policy = TrackingPolicy::from_configs(message.config(), connection)?;
                violations.extend(policy.check(message));
            }
            if !violations.is_empty() {
                debug!(
                    subject = message.subject(),
                    %schema_id,
                    violations = violations.len(),
                    "message failed validation"
                );
                return Err(SpecificationError::ValidationFailed { schema_id, violations });
            }
        }
        self.run_custom_validator(message)
    }

    // -----------------------------------------------------------------------
    // Custom validator
    // -----------------------------------------------------------------------

    /// Install the custom validator, replacing any previous one.
    pub fn register_message_validator(&self, validator: Arc<dyn MessageValidator>) {
        *self.validator.write() = Some(validator);
    }

    /// Remove the custom validator.
    pub fn clear_message_validator(&self) {
        *self.validator.write() = None;
    }

    fn run_custom_validator(&self, message: &Message) -> Result<(), SpecificationError> {
        let Some(validator) = self.validator.read().clone() else {
            return Ok(());
        };
        match panic::catch_unwind(AssertUnwindSafe(|| validator.validate(message))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => Err(SpecificationError::CustomValidator(reason)),
            Err(payload) => Err(SpecificationError::CustomValidator(format!(
                "validator panicked: {}",
                panic_message(payload.as_ref())
            ))),
        }
    }

    // -----------------------------------------------------------------------
    // Factory
    // -----------------------------------------------------------------------

    /// New message bound to the template `schema_id` (shorthand or
    /// fully-qualified), with explicit values pre-populated.
    ///
    /// # Errors
    ///
    /// [`SpecificationError::UnknownTemplate`] for an unknown ID;
    /// [`SpecificationError::Field`] if an explicit value does not fit.
    pub fn create_message(&self, schema_id: &str) -> Result<Message, SpecificationError> {
        let template = self
            .template(schema_id)
            .ok_or_else(|| SpecificationError::UnknownTemplate(schema_id.to_string()))?;
        let mut message = factory::create_message(&template)?;
        message.set_config(self.message_config());
        Ok(message)
    }

    /// Subject for `message` from its template's subject elements.
    ///
    /// # Errors
    ///
    /// As [`Specification::template_for`].
    pub fn build_subject(&self, message: &Message) -> Result<String, SpecificationError> {
        Ok(self.template_for(message)?.build_subject(message))
    }

    /// Response-topic pattern for replies to `message`.
    ///
    /// # Errors
    ///
    /// As [`Specification::template_for`].
    pub fn response_topic(&self, message: &Message) -> Result<String, SpecificationError> {
        Ok(self.template_for(message)?.response_topic(message))
    }

    fn message_config(&self) -> Config {
        let mut config = Config::new();
        config.add_value(keys::SPECIFICATION_VERSION, self.version().as_str());
        config
    }
}

impl fmt::Debug for Specification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables = self.tables();
        f.debug_struct("Specification")
            .field("version", &tables.version().as_str())
            .field("schema_level", &tables.ceiling())
            .field("validation_level", &self.config.validation_level)
            .field("templates", &tables.len())
            .field("registry", &self.registry.len())
            .finish()
    }
}

fn missing_schema_path() -> SpecificationError {
    SpecificationError::Config(ConfigError::InvalidValue {
        key: keys::SCHEMA_PATH.to_string(),
        value: String::new(),
        expected: "a schema directory".to_string(),
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemorySource;
    use gmsec_core::{Field, MessageKind};

    const DIRECTORY: &str = r#"<DIRECTORY>
        <LEVEL NUMBER="0" NAME="C2MS"/>
        <SCHEMA ID="HEADER" LEVEL="0" DEFINITION="MESSAGE-TYPE,MESSAGE-SUBTYPE"/>
    </DIRECTORY>"#;

    const HEADER: &str = r#"<SCHEMA ID="HEADER" LEVEL="0">
        <FIELD NAME="MESSAGE-TYPE" TYPE="STRING"/>
        <FIELD NAME="MESSAGE-SUBTYPE" TYPE="STRING"/>
    </SCHEMA>"#;

    const LOG: &str = r#"<SCHEMA ID="MSG.LOG" LEVEL="0" SUBJECT="C2MS.MESSAGE-TYPE.MESSAGE-SUBTYPE">
        <FIELD NAME="MESSAGE-TYPE" TYPE="STRING" VALUE="MSG"/>
        <FIELD NAME="MESSAGE-SUBTYPE" TYPE="STRING" VALUE="LOG"/>
        <FIELD NAME="SEVERITY" TYPE="I16" VALUE="1..4"/>
    </SCHEMA>"#;

    fn spec(level: ValidationLevel) -> Specification {
        let source = MemorySource::new()
            .with_file("DIRECTORY.xml", DIRECTORY)
            .with_file("C2MS.HEADER.xml", HEADER)
            .with_file("C2MS.MSG.LOG.xml", LOG);
        let config = SpecificationConfig {
            legacy_schema_files: true,
            validation_level: level,
            ..SpecificationConfig::default()
        };
        Specification::from_source(config, &source).unwrap()
    }

    fn rejecting(reason: &'static str) -> Arc<dyn MessageValidator> {
        Arc::new(move |_: &Message| -> Result<(), String> { Err(reason.to_string()) })
    }

    fn log_message(severity: i16) -> Message {
        let mut msg = Message::new("C2MS.MSG.LOG", MessageKind::Publish);
        msg.add_field(Field::new("MESSAGE-TYPE", "MSG").unwrap());
        msg.add_field(Field::new("MESSAGE-SUBTYPE", "LOG").unwrap());
        msg.add_field(Field::new("SEVERITY", severity).unwrap());
        msg
    }

    #[test]
    fn validates_and_caches_resolution() {
        let spec = spec(ValidationLevel::EnforceStrict);
        spec.validate_message(&log_message(2)).unwrap();
        spec.validate_message(&log_message(3)).unwrap();
        assert_eq!(spec.registry().resolution_count(), 1);
        assert_eq!(
            spec.registry().get("C2MS.MSG.LOG").as_deref(),
            Some("2019.00.C2MS.MSG.LOG")
        );
    }

    #[test]
    fn reports_violations_with_class_and_code() {
        let err = spec(ValidationLevel::EnforceRequired)
            .validate_message(&log_message(9))
            .unwrap_err();
        assert_eq!(err.class(), crate::error::ErrorClass::MessageValidation);
        assert_eq!(err.code(), crate::error::error_codes::MESSAGE_VALIDATION_FAILED);
        assert_eq!(err.violations().unwrap().len(), 1);
        assert!(err.to_string().contains("SEVERITY"));
    }

    #[test]
    fn no_enforcement_skips_resolution() {
        let spec = spec(ValidationLevel::NoEnforcement);
        spec.validate_message(&Message::new("UNKNOWN", MessageKind::Publish)).unwrap();
        assert_eq!(spec.registry().resolution_count(), 0);
    }

    #[test]
    fn custom_validator_last_registration_wins() {
        let spec = spec(ValidationLevel::EnforceRequired);
        spec.register_message_validator(rejecting("first"));
        spec.register_message_validator(rejecting("second"));
        let err = spec.validate_message(&log_message(2)).unwrap_err();
        assert!(matches!(err, SpecificationError::CustomValidator(ref r) if r == "second"));

        spec.clear_message_validator();
        spec.validate_message(&log_message(2)).unwrap();
    }

    #[test]
    fn panicking_validator_is_contained() {
        let spec = spec(ValidationLevel::EnforceRequired);
        spec.register_message_validator(Arc::new(|_: &Message| -> Result<(), String> {
            panic!("validator bug")
        }));
        let err = spec.validate_message(&log_message(2)).unwrap_err();
        assert!(err.to_string().contains("validator bug"));
        assert_eq!(err.class(), crate::error::ErrorClass::CustomValidation);

        spec.clear_message_validator();
        spec.validate_message(&log_message(2)).unwrap();
    }

    #[test]
    fn custom_validator_not_run_when_builtin_fails() {
        let spec = spec(ValidationLevel::EnforceRequired);
        spec.register_message_validator(rejecting("custom"));
        let err = spec.validate_message(&log_message(9)).unwrap_err();
        assert!(matches!(err, SpecificationError::ValidationFailed { .. }));
    }

    #[test]
    fn create_message_binds_template() {
        let spec = spec(ValidationLevel::EnforceStrict);
        let mut msg = spec.create_message("MSG.LOG").unwrap();
        assert_eq!(msg.subject(), "C2MS.MSG.LOG");
        msg.set_field_value("SEVERITY", "2").unwrap();
        spec.validate_message(&msg).unwrap();
        assert_eq!(spec.registry().resolution_count(), 0);

        assert!(matches!(
            spec.create_message("MSG.NOPE"),
            Err(SpecificationError::UnknownTemplate(_))
        ));
    }

    #[test]
    fn toggles_gate_transport_hooks() {
        let spec = spec(ValidationLevel::EnforceStrict);
        spec.validate_on_receive(&log_message(9)).unwrap();
        spec.validate_on_send(&log_message(9), &Config::new()).unwrap();
    }

    #[test]
    fn switch_version_failure_keeps_snapshot() {
        let spec = spec(ValidationLevel::EnforceStrict);
        let empty = MemorySource::new();
        let version = SpecVersion::parse("202400").unwrap();
        assert!(spec.switch_version_from(version, &empty).is_err());
        assert_eq!(spec.version().as_str(), "201900");
        assert!(spec.switch_version("2024").is_err());
    }

    #[test]
    fn switch_version_clears_registry() {
        let spec = spec(ValidationLevel::EnforceStrict);
        spec.validate_message(&log_message(2)).unwrap();
        assert_eq!(spec.registry().len(), 1);

        let next = MemorySource::new()
            .with_file("DIRECTORY.xml", DIRECTORY)
            .with_file("C2MS.HEADER.xml", HEADER)
            .with_file("C2MS.MSG.LOG.xml", LOG);
        spec.switch_version_from(SpecVersion::parse("202400").unwrap(), &next)
            .unwrap();
        assert!(spec.registry().is_empty());
        assert_eq!(spec.lookup_schema_id(&log_message(2)).unwrap(), "2024.00.C2MS.MSG.LOG");
    }
}
