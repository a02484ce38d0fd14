//! # Reserved Tracking Fields
//!
//! The transport layer populates certain fields itself (NODE, UNIQUE-ID,
//! ...). A user-supplied value for one of them is only accepted on publish
//! when that field's tracking concern is enabled.
//!
//! Each side (message config, connection config) resolves a concern to ON,
//! OFF, or unset: the concern-specific key wins over the global `TRACKING`
//! key. The two sides then combine with OFF taking precedence; when neither
//! side says OFF the concern is ON.

use std::fmt;

use gmsec_core::{keys, Config, ConfigError, Message, TriState};

use crate::validate::Violation;

/// A tracking concern, each governed by one configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackingConcern {
    /// NODE.
    Node,
    /// PROCESS-ID.
    ProcessId,
    /// USER-NAME.
    UserName,
    /// CONNECTION-ID.
    ConnectionId,
    /// PUBLISH-TIME.
    PublishTime,
    /// UNIQUE-ID.
    UniqueId,
    /// MW-INFO.
    MwInfo,
    /// NUM-OF-SUBSCRIPTIONS and SUBSCRIPTION.n.SUBJECT-PATTERN.
    ActiveSubscriptions,
    /// CONNECTION-ENDPOINT and MW-CONNECTION-ENDPOINT.
    ConnectionEndpoint,
}

impl TrackingConcern {
    /// Every concern.
    pub const ALL: [TrackingConcern; 9] = [
        TrackingConcern::Node,
        TrackingConcern::ProcessId,
        TrackingConcern::UserName,
        TrackingConcern::ConnectionId,
        TrackingConcern::PublishTime,
        TrackingConcern::UniqueId,
        TrackingConcern::MwInfo,
        TrackingConcern::ActiveSubscriptions,
        TrackingConcern::ConnectionEndpoint,
    ];

    /// Configuration key overriding the global switch for this concern.
    pub fn config_key(&self) -> &'static str {
        match self {
            TrackingConcern::Node => keys::TRACKING_NODE,
            TrackingConcern::ProcessId => keys::TRACKING_PROCESS_ID,
            TrackingConcern::UserName => keys::TRACKING_USERNAME,
            TrackingConcern::ConnectionId => keys::TRACKING_CONNECTION_ID,
            TrackingConcern::PublishTime => keys::TRACKING_PUBLISH_TIME,
            TrackingConcern::UniqueId => keys::TRACKING_UNIQUE_ID,
            TrackingConcern::MwInfo => keys::TRACKING_MW_INFO,
            TrackingConcern::ActiveSubscriptions => keys::TRACKING_ACTIVE_SUBSCRIPTIONS,
            TrackingConcern::ConnectionEndpoint => keys::TRACKING_CONNECTION_ENDPOINT,
        }
    }
}

impl fmt::Display for TrackingConcern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}

const RESERVED_FIELDS: &[(&str, TrackingConcern)] = &[
    ("CONNECTION-ID", TrackingConcern::ConnectionId),
    ("MW-INFO", TrackingConcern::MwInfo),
    ("NODE", TrackingConcern::Node),
    ("PROCESS-ID", TrackingConcern::ProcessId),
    ("PUBLISH-TIME", TrackingConcern::PublishTime),
    ("UNIQUE-ID", TrackingConcern::UniqueId),
    ("USER-NAME", TrackingConcern::UserName),
    ("NUM-OF-SUBSCRIPTIONS", TrackingConcern::ActiveSubscriptions),
    ("CONNECTION-ENDPOINT", TrackingConcern::ConnectionEndpoint),
    ("MW-CONNECTION-ENDPOINT", TrackingConcern::ConnectionEndpoint),
];

/// Tracking concern governing a reserved field name, if it is one.
pub fn reserved_concern(name: &str) -> Option<TrackingConcern> {
    if let Some((_, concern)) = RESERVED_FIELDS.iter().find(|(n, _)| *n == name) {
        return Some(*concern);
    }
    let index = name
        .strip_prefix("SUBSCRIPTION.")
        .and_then(|rest| rest.strip_suffix(".SUBJECT-PATTERN"))?;
    index
        .parse::<u32>()
        .ok()
        .filter(|i| *i > 0)
        .map(|_| TrackingConcern::ActiveSubscriptions)
}

/// True for reserved tracking field names.
pub fn is_reserved(name: &str) -> bool {
    reserved_concern(name).is_some()
}

/// Effective tracking switches for one publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingPolicy {
    enabled: [bool; TrackingConcern::ALL.len()],
}

impl TrackingPolicy {
    /// Combine message-level and connection-level configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a tracking key whose value
    /// is not a recognized switch.
    pub fn from_configs(message: &Config, connection: &Config) -> Result<Self, ConfigError> {
        let mut enabled = [true; TrackingConcern::ALL.len()];
        for (slot, concern) in enabled.iter_mut().zip(TrackingConcern::ALL) {
            let a = side_state(message, concern)?;
            let b = side_state(connection, concern)?;
            *slot = a != TriState::Off && b != TriState::Off;
        }
        Ok(Self { enabled })
    }

    /// True if the concern is effectively ON.
    pub fn is_enabled(&self, concern: TrackingConcern) -> bool {
        TrackingConcern::ALL
            .iter()
            .position(|c| *c == concern)
            .map_or(true, |i| self.enabled[i])
    }

    /// One violation per reserved field present while its concern is OFF.
    pub fn check(&self, message: &Message) -> Vec<Violation> {
        message
            .fields()
            .filter_map(|field| {
                let name = field.name();
                let concern = reserved_concern(name)?;
                (!self.is_enabled(concern)).then(|| {
                    Violation::reserved(
                        name,
                        format!("{name} is a reserved tracking field and may not be set while {concern} is off"),
                    )
                })
            })
            .collect()
    }
}

impl Default for TrackingPolicy {
    fn default() -> Self {
        Self {
            enabled: [true; TrackingConcern::ALL.len()],
        }
    }
}

fn side_state(config: &Config, concern: TrackingConcern) -> Result<TriState, ConfigError> {
    match config.get_tristate(concern.config_key())? {
        TriState::Unset => config.get_tristate(keys::TRACKING),
        state => Ok(state),
    }
}
