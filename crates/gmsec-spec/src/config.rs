//! # Specification Configuration
//!
//! Typed view over the GMSEC configuration keys that govern schema loading
//! and validation. Built once from a [`Config`]; invalid values fail here
//! rather than at first use.

use std::fmt;
use std::path::PathBuf;

use gmsec_core::{keys, Config, ConfigError};

/// Default specification version.
pub const DEFAULT_VERSION: &str = "201900";

// ---------------------------------------------------------------------------
// ValidationLevel
// ---------------------------------------------------------------------------

/// Enforcement level, strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ValidationLevel {
    /// Skip validation entirely.
    NoEnforcement = 0,
    /// REQUIRED fields must be present and valid.
    EnforceRequired = 1,
    /// Present OPTIONAL fields must also be valid.
    EnforceOptional = 2,
    /// Undeclared fields are rejected as well.
    #[default]
    EnforceStrict = 3,
}

impl ValidationLevel {
    /// Every level, weakest first.
    pub const ALL: [ValidationLevel; 4] = [
        ValidationLevel::NoEnforcement,
        ValidationLevel::EnforceRequired,
        ValidationLevel::EnforceOptional,
        ValidationLevel::EnforceStrict,
    ];

    /// Parse `0`-`3` or a named alias, case-insensitively.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "0" | "NO_ENFORCEMENT" => Some(ValidationLevel::NoEnforcement),
            "1" | "ENFORCE_REQUIRED" => Some(ValidationLevel::EnforceRequired),
            "2" | "ENFORCE_OPTIONAL" => Some(ValidationLevel::EnforceOptional),
            "3" | "ENFORCE_STRICT" => Some(ValidationLevel::EnforceStrict),
            _ => None,
        }
    }

    /// Canonical alias.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationLevel::NoEnforcement => "NO_ENFORCEMENT",
            ValidationLevel::EnforceRequired => "ENFORCE_REQUIRED",
            ValidationLevel::EnforceOptional => "ENFORCE_OPTIONAL",
            ValidationLevel::EnforceStrict => "ENFORCE_STRICT",
        }
    }
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SpecVersion
// ---------------------------------------------------------------------------

/// A specification version such as `201900`: major is the first four
/// digits, minor is the remainder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpecVersion {
    digits: String,
}

impl SpecVersion {
    /// Parse a digits-only version of at least five digits.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] otherwise.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let text = text.trim();
        if text.len() < 5 || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::InvalidValue {
                key: keys::SPECIFICATION_VERSION.to_string(),
                value: text.to_string(),
                expected: "a digits-only version such as 201900".to_string(),
            });
        }
        Ok(Self {
            digits: text.to_string(),
        })
    }

    /// The full digit string, also the schema directory name.
    pub fn as_str(&self) -> &str {
        &self.digits
    }

    /// Major component, e.g. `2019`.
    pub fn major(&self) -> &str {
        &self.digits[..4]
    }

    /// Minor component, e.g. `00`.
    pub fn minor(&self) -> &str {
        &self.digits[4..]
    }
}

impl Default for SpecVersion {
    fn default() -> Self {
        Self {
            digits: DEFAULT_VERSION.to_string(),
        }
    }
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.digits)
    }
}

// ---------------------------------------------------------------------------
// SpecificationConfig
// ---------------------------------------------------------------------------

/// Settings for one `Specification` instance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecificationConfig {
    /// Specification version to load.
    pub version: SpecVersion,
    /// Filesystem root holding one directory per version.
    pub schema_path: Option<PathBuf>,
    /// Requested schema level ceiling.
    pub schema_level: u32,
    /// Enforcement level.
    pub validation_level: ValidationLevel,
    /// Read `.xml` templates instead of `.xsd`.
    pub legacy_schema_files: bool,
    /// Validate before send.
    pub validate_send: bool,
    /// Validate on receive.
    pub validate_recv: bool,
}

impl SpecificationConfig {
    /// Interpret the recognized keys of `config`; absent keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad key.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let version = match config.get_value(keys::SPECIFICATION_VERSION) {
            Some(v) => SpecVersion::parse(v)?,
            None => SpecVersion::default(),
        };

        let level = config.get_integer(keys::SCHEMA_LEVEL, 0)?;
        let schema_level = u32::try_from(level).map_err(|_| ConfigError::InvalidValue {
            key: keys::SCHEMA_LEVEL.to_string(),
            value: level.to_string(),
            expected: "a non-negative schema level".to_string(),
        })?;

        let validation_level = match config.get_value(keys::VALIDATION_LEVEL) {
            None => ValidationLevel::default(),
            Some(v) => ValidationLevel::from_token(v).ok_or_else(|| ConfigError::InvalidValue {
                key: keys::VALIDATION_LEVEL.to_string(),
                value: v.to_string(),
                expected: "0-3 or NO_ENFORCEMENT, ENFORCE_REQUIRED, ENFORCE_OPTIONAL, ENFORCE_STRICT"
                    .to_string(),
            })?,
        };

        let validate_all = config.get_bool(keys::VALIDATE_ALL, false)?;

        Ok(Self {
            version,
            schema_path: config.get_value(keys::SCHEMA_PATH).map(PathBuf::from),
            schema_level,
            validation_level,
            legacy_schema_files: config.get_bool(keys::LEGACY_SCHEMA_FILES, false)?,
            validate_send: validate_all || config.get_bool(keys::VALIDATE_SEND, false)?,
            validate_recv: validate_all || config.get_bool(keys::VALIDATE_RECV, false)?,
        })
    }
}
