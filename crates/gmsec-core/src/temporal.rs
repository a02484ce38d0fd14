//! # GMSEC Time
//!
//! UTC timestamps in the GMSEC day-of-year grammar,
//! `YYYY-DDD-HH:MM:SS[.sss]` (e.g. `2019-100-12:30:45.250`).
//! ISO 8601 / RFC 3339 text is also accepted on input.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};

/// A UTC timestamp rendered in GMSEC day-of-year form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GmsecTime(DateTime<Utc>);

impl GmsecTime {
    /// The current UTC time.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Wrap a `chrono` UTC timestamp.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Access the underlying timestamp.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Parse GMSEC day-of-year text, falling back to RFC 3339.
    pub fn parse(text: &str) -> Option<Self> {
        if has_gmsec_shape(text) {
            let format = if text.len() > 17 {
                "%Y-%j-%H:%M:%S%.f"
            } else {
                "%Y-%j-%H:%M:%S"
            };
            return NaiveDateTime::parse_from_str(text, format)
                .ok()
                .map(|naive| Self(naive.and_utc()));
        }
        DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|dt| Self(dt.with_timezone(&Utc)))
    }

    /// Render with millisecond precision.
    pub fn to_gmsec_string(&self) -> String {
        self.0.format("%Y-%j-%H:%M:%S%.3f").to_string()
    }
}

impl fmt::Display for GmsecTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_gmsec_string())
    }
}

impl From<DateTime<Utc>> for GmsecTime {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

/// Checks the fixed-width layout `DDDD-DDD-DD:DD:DD` with an optional
/// `.D+` fraction. `chrono` alone accepts variable-width numbers.
fn has_gmsec_shape(text: &str) -> bool {
    const LAYOUT: &[u8] = b"9999-999-99:99:99";
    let bytes = text.as_bytes();
    if bytes.len() < LAYOUT.len() {
        return false;
    }
    let (head, tail) = bytes.split_at(LAYOUT.len());
    let head_ok = head.iter().zip(LAYOUT).all(|(b, l)| match l {
        b'9' => b.is_ascii_digit(),
        other => b == other,
    });
    let tail_ok = match tail.split_first() {
        None => true,
        Some((b'.', digits)) => !digits.is_empty() && digits.iter().all(u8::is_ascii_digit),
        Some(_) => false,
    };
    head_ok && tail_ok
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_day_of_year_form() {
        let t = GmsecTime::parse("2019-100-12:30:45.250").unwrap();
        assert_eq!(t.to_gmsec_string(), "2019-100-12:30:45.250");
        assert!(GmsecTime::parse("2019-100-12:30:45").is_some());
    }

    #[test]
    fn rejects_out_of_range_components() {
        assert!(GmsecTime::parse("2019-367-12:30:45").is_none());
        assert!(GmsecTime::parse("2019-100-25:30:45").is_none());
        assert!(GmsecTime::parse("2019-100-12:30:45.").is_none());
        assert!(GmsecTime::parse("19-100-12:30:45").is_none());
    }

    #[test]
    fn leap_day_of_year() {
        assert!(GmsecTime::parse("2020-366-00:00:00").is_some());
        assert!(GmsecTime::parse("2019-366-00:00:00").is_none());
    }

    #[test]
    fn accepts_rfc3339() {
        let t = GmsecTime::parse("2019-04-10T12:30:45Z").unwrap();
        assert_eq!(t.to_gmsec_string(), "2019-100-12:30:45.000");
    }

    #[test]
    fn now_renders_in_gmsec_shape() {
        let rendered = GmsecTime::now().to_string();
        assert!(GmsecTime::parse(&rendered).is_some(), "{rendered}");
    }
}
