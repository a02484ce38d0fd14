//! # gmsec-cli: Command-line Front End for Message Specifications
//!
//! Provides the `gmsec` binary:
//!
//! - `gmsec list`: loaded levels and message templates.
//! - `gmsec describe <ID>`: one template's field tree.
//! - `gmsec create <ID>`: a template-bound message, JSON-encoded.
//! - `gmsec validate <FILE>...`: validate JSON-encoded messages.
//!
//! ```bash
//! gmsec --schema-path templates --schema-level 1 list
//! gmsec --schema-path templates -c GMSEC-VALIDATION-LEVEL=2 validate msg.json
//! ```
//!
//! Schema settings come from a YAML configuration file, then `-c KEY=VALUE`
//! pairs, then the dedicated flags, each layer overriding the previous.

pub mod inspect;
pub mod validate;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use gmsec_core::{keys, Config};
use gmsec_spec::{Specification, ValidationLevel};

/// Schema selection options shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct SpecArgs {
    /// YAML file of configuration keys (e.g. GMSEC-SCHEMA-PATH).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Extra configuration entries as KEY=VALUE. Repeatable.
    #[arg(short = 'c', long = "set", value_name = "KEY=VALUE", global = true)]
    pub set: Vec<String>,

    /// Root directory holding one subdirectory per specification version.
    #[arg(long, global = true)]
    pub schema_path: Option<PathBuf>,

    /// Specification version, e.g. 201900.
    #[arg(long = "spec-version", global = true)]
    pub spec_version: Option<String>,

    /// Highest schema level to load.
    #[arg(long, global = true)]
    pub schema_level: Option<u32>,

    /// Enforcement level: 0-3 or NO_ENFORCEMENT .. ENFORCE_STRICT.
    #[arg(long, global = true, value_parser = parse_validation_level)]
    pub validation_level: Option<ValidationLevel>,

    /// Read legacy `.xml` templates instead of `.xsd`.
    #[arg(long, global = true)]
    pub legacy: bool,
}

impl SpecArgs {
    /// Layered configuration: file, then `-c` pairs, then flags.
    pub fn to_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config file: {}", path.display()))?;
                Config::from_yaml_str(&text)
                    .with_context(|| format!("invalid config file: {}", path.display()))?
            }
            None => Config::new(),
        };

        for pair in &self.set {
            let (key, value) = pair
                .split_once('=')
                .with_context(|| format!("expected KEY=VALUE, got '{pair}'"))?;
            config.add_value(key.trim(), value.trim());
        }

        if let Some(path) = &self.schema_path {
            config.add_value(keys::SCHEMA_PATH, &path.to_string_lossy());
        }
        if let Some(version) = &self.spec_version {
            config.add_value(keys::SPECIFICATION_VERSION, version);
        }
        if let Some(level) = self.schema_level {
            config.add_value(keys::SCHEMA_LEVEL, &level.to_string());
        }
        if let Some(level) = self.validation_level {
            config.add_value(keys::VALIDATION_LEVEL, level.as_str());
        }
        if self.legacy {
            config.add_value(keys::LEGACY_SCHEMA_FILES, "true");
        }
        Ok(config)
    }

    /// Load the specification these options describe.
    pub fn load(&self) -> Result<Specification> {
        let config = self.to_config()?;
        let spec = Specification::new(&config).context("failed to load message specification")?;
        tracing::debug!(?spec, "specification loaded");
        Ok(spec)
    }
}

fn parse_validation_level(text: &str) -> Result<ValidationLevel, String> {
    ValidationLevel::from_token(text).ok_or_else(|| {
        format!("unknown validation level '{text}' (expected 0-3 or NO_ENFORCEMENT, ENFORCE_REQUIRED, ENFORCE_OPTIONAL, ENFORCE_STRICT)")
    })
}
