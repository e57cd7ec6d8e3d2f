//! # Temporal Types: UTC-Only Timestamps
//!
//! Defines `Timestamp`, a UTC timestamp truncated to millisecond precision
//! with a single textual form: `YYYY-MM-DDTHH:MM:SS.mmmZ`.
//!
//! ## Invariant
//!
//! The textual form is both what gets hashed into a receipt's chain hash and
//! what gets stored. Because it is fixed-width and always `Z`-suffixed,
//! string comparison equals chronological comparison, which the ledger relies
//! on for `since`/`until` range queries.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A UTC timestamp, truncated to milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated to milliseconds.
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, dropping sub-millisecond digits.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        let millis = dt.timestamp_millis();
        Self(DateTime::from_timestamp_millis(millis).unwrap_or(dt))
    }

    /// Parse an RFC 3339 string, accepting any offset and converting to UTC.
    ///
    /// Used for stored values and for operator-supplied range filters such
    /// as `2024-05-01T00:00:00+02:00`.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| CoreError::InvalidTimestamp {
            input: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_utc(dt.with_timezone(&Utc)))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Render as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
    pub fn to_iso8601(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.to_iso8601()
    }
}

impl TryFrom<String> for Timestamp {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_iso8601_format() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 45).unwrap()
            + chrono::Duration::microseconds(123_456);
        let ts = Timestamp::from_utc(dt);
        assert_eq!(ts.to_iso8601(), "2024-01-15T12:30:45.123Z");
    }

    #[test]
    fn test_whole_seconds_keep_millis() {
        let ts = Timestamp::from_utc(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        assert_eq!(ts.to_string(), "2024-06-01T00:00:00.000Z");
    }

    #[test]
    fn test_parse_converts_offsets_to_utc() {
        let ts = Timestamp::parse("2024-01-15T14:30:45.500+02:00").unwrap();
        assert_eq!(ts.to_iso8601(), "2024-01-15T12:30:45.500Z");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = Timestamp::parse("yesterday").unwrap_err();
        assert!(matches!(err, CoreError::InvalidTimestamp { .. }));
    }

    #[test]
    fn test_string_order_matches_time_order() {
        let a = Timestamp::parse("2024-01-15T09:59:59.999Z").unwrap();
        let b = Timestamp::parse("2024-01-15T10:00:00.000Z").unwrap();
        assert!(a < b);
        assert!(a.to_iso8601() < b.to_iso8601());
    }

    #[test]
    fn test_serde_uses_text_form() {
        let ts = Timestamp::parse("2024-03-01T08:00:00.250Z").unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, r#""2024-03-01T08:00:00.250Z""#);
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }
}
