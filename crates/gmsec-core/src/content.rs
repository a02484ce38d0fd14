//! # Content Patterns
//!
//! Semantic format constraints on a field's textual value, checked
//! independently of the field's type and allowed-value rules.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::temporal::GmsecTime;

/// A recognized content-pattern tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentPattern {
    /// GMSEC day-of-year timestamp.
    Time,
    /// IPv4 or IPv6 literal.
    IpAddress,
    /// Subject-safe header string: upper-case letters, digits, `-` and `_`.
    HeaderString,
}

impl ContentPattern {
    /// Parse a pattern tag, case-insensitively.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "TIME" => Some(ContentPattern::Time),
            "IP_ADDRESS" => Some(ContentPattern::IpAddress),
            "HEADER_STRING" => Some(ContentPattern::HeaderString),
            _ => None,
        }
    }

    /// Canonical tag text.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentPattern::Time => "TIME",
            ContentPattern::IpAddress => "IP_ADDRESS",
            ContentPattern::HeaderString => "HEADER_STRING",
        }
    }

    /// True if `text` satisfies this pattern's grammar.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            ContentPattern::Time => GmsecTime::parse(text).is_some(),
            ContentPattern::IpAddress => text.parse::<IpAddr>().is_ok(),
            ContentPattern::HeaderString => is_header_string(text),
        }
    }
}

impl fmt::Display for ContentPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header strings become subject elements, so they may only hold characters
/// that are legal in a subject token.
pub fn is_header_string(text: &str) -> bool {
    !text.is_empty()
        && text
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
}
