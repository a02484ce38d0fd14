//! # Configuration
//!
//! Case-insensitive key/value configuration shared by connections, messages,
//! and the message specification. Keys are normalized to upper case; values
//! are kept verbatim and interpreted on demand by typed accessors.
//!
//! A `Config` can be built from `key=value` argument lists (the form used on
//! command lines), from a flat YAML mapping, or programmatically.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::ConfigError;

/// Recognized configuration keys.
pub mod keys {
    /// Specification version, digits only (e.g. `201900`).
    pub const SPECIFICATION_VERSION: &str = "GMSEC-SPECIFICATION-VERSION";
    /// Filesystem root holding one directory per specification version.
    pub const SCHEMA_PATH: &str = "GMSEC-SCHEMA-PATH";
    /// Highest schema level (addendum layer) to load.
    pub const SCHEMA_LEVEL: &str = "GMSEC-SCHEMA-LEVEL";
    /// Validation enforcement level, 0-3 or a named alias.
    pub const VALIDATION_LEVEL: &str = "GMSEC-VALIDATION-LEVEL";
    /// Load the legacy XML template dialect instead of XSD.
    pub const LEGACY_SCHEMA_FILES: &str = "GMSEC-LEGACY-SCHEMA-FILES";
    /// Validate messages before they are sent.
    pub const VALIDATE_SEND: &str = "GMSEC-MSG-CONTENT-VALIDATE-SEND";
    /// Validate messages as they are received.
    pub const VALIDATE_RECV: &str = "GMSEC-MSG-CONTENT-VALIDATE-RECV";
    /// Validate messages in both directions.
    pub const VALIDATE_ALL: &str = "GMSEC-MSG-CONTENT-VALIDATE-ALL";

    /// Global tracking switch.
    pub const TRACKING: &str = "TRACKING";
    /// Tracking override for NODE.
    pub const TRACKING_NODE: &str = "TRACKING-NODE";
    /// Tracking override for PROCESS-ID.
    pub const TRACKING_PROCESS_ID: &str = "TRACKING-PROCESS-ID";
    /// Tracking override for USER-NAME.
    pub const TRACKING_USERNAME: &str = "TRACKING-USERNAME";
    /// Tracking override for CONNECTION-ID.
    pub const TRACKING_CONNECTION_ID: &str = "TRACKING-CONNECTION-ID";
    /// Tracking override for PUBLISH-TIME.
    pub const TRACKING_PUBLISH_TIME: &str = "TRACKING-PUBLISH-TIME";
    /// Tracking override for UNIQUE-ID.
    pub const TRACKING_UNIQUE_ID: &str = "TRACKING-UNIQUE-ID";
    /// Tracking override for MW-INFO.
    pub const TRACKING_MW_INFO: &str = "TRACKING-MW-INFO";
    /// Tracking override for the active subscription list.
    pub const TRACKING_ACTIVE_SUBSCRIPTIONS: &str = "TRACKING-ACTIVE-SUBSCRIPTIONS";
    /// Tracking override for connection endpoints.
    pub const TRACKING_CONNECTION_ENDPOINT: &str = "TRACKING-CONNECTION-ENDPOINT";
}

/// A three-valued switch: explicitly on, explicitly off, or not configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TriState {
    /// Explicitly enabled.
    On,
    /// Explicitly disabled.
    Off,
    /// Not configured.
    #[default]
    Unset,
}

/// Case-insensitive key/value configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    values: BTreeMap<String, String>,
}

impl Config {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from `key=value` arguments. Arguments without
    /// an `=` are ignored, matching the command-line convention where
    /// positional arguments may be interleaved with settings.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Self::new();
        for arg in args {
            if let Some((key, value)) = arg.as_ref().split_once('=') {
                config.add_value(key, value);
            }
        }
        config
    }

    /// Build a configuration from a flat YAML mapping of scalars.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the document is not valid YAML,
    /// is not a mapping, or holds non-scalar values.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let doc: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mapping = match doc {
            serde_yaml::Value::Mapping(m) => m,
            serde_yaml::Value::Null => return Ok(Self::new()),
            _ => return Err(ConfigError::Parse("expected a mapping at top level".to_string())),
        };
        let mut config = Self::new();
        for (k, v) in mapping {
            let key = scalar_to_string(&k)
                .ok_or_else(|| ConfigError::Parse(format!("unsupported key: {k:?}")))?;
            let value = scalar_to_string(&v)
                .ok_or_else(|| ConfigError::Parse(format!("unsupported value for {key}: {v:?}")))?;
            config.add_value(&key, &value);
        }
        Ok(config)
    }

    /// Set a value, replacing any previous value for the key.
    pub fn add_value(&mut self, key: &str, value: &str) {
        self.values
            .insert(normalize_key(key), value.trim().to_string());
    }

    /// Remove a value. Returns true if the key was present.
    pub fn clear_value(&mut self, key: &str) -> bool {
        self.values.remove(&normalize_key(key)).is_some()
    }

    /// Raw value lookup.
    pub fn get_value(&self, key: &str) -> Option<&str> {
        self.values.get(&normalize_key(key)).map(String::as_str)
    }

    /// Boolean lookup with a default for absent keys.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for values other than
    /// true/false/yes/no/on/off/1/0.
    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.get_tristate(key)? {
            TriState::On => Ok(true),
            TriState::Off => Ok(false),
            TriState::Unset => Ok(default),
        }
    }

    /// Integer lookup with a default for absent keys.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the value is not an integer.
    pub fn get_integer(&self, key: &str, default: i64) -> Result<i64, ConfigError> {
        match self.get_value(key) {
            None => Ok(default),
            Some(v) => v.parse::<i64>().map_err(|_| ConfigError::InvalidValue {
                key: normalize_key(key),
                value: v.to_string(),
                expected: "an integer".to_string(),
            }),
        }
    }

    /// Three-valued lookup: absent keys are [`TriState::Unset`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for unrecognized switch values.
    pub fn get_tristate(&self, key: &str) -> Result<TriState, ConfigError> {
        let Some(raw) = self.get_value(key) else {
            return Ok(TriState::Unset);
        };
        match raw.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(TriState::On),
            "false" | "no" | "off" | "0" => Ok(TriState::Off),
            _ => Err(ConfigError::InvalidValue {
                key: normalize_key(key),
                value: raw.to_string(),
                expected: "true/false, yes/no, on/off or 1/0".to_string(),
            }),
        }
    }

    /// Iterate over (normalized key, value) pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of configured keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if nothing is configured.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Overlay `other` on top of this configuration; `other` wins on conflicts.
    pub fn merge(&mut self, other: &Config) {
        for (k, v) in &other.values {
            self.values.insert(k.clone(), v.clone());
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_uppercase()
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
