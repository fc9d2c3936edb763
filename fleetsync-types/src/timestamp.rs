//! UTC timestamps used for `createdAt`, `updatedAt` and `deletedAt`.
//!
//! Timestamps are kept at millisecond precision and serialized the way the
//! web client writes them (`2024-01-01T00:00:00.000Z`). Parsing is lenient
//! because records written by older clients use several formats:
//! - RFC 3339 (`2024-01-01T10:00:00+02:00`)
//! - naive date-time, read as UTC (`2024-01-01T10:00:00.123`)
//! - bare date, read as midnight UTC (`2024-01-01`)
//! - epoch milliseconds as a JSON integer

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A millisecond-precision UTC instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current time, truncated to milliseconds.
    #[must_use]
    pub fn now() -> Self {
        Self::truncated(Utc::now())
    }

    /// Creates a timestamp from epoch milliseconds.
    #[must_use]
    pub fn from_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(Self)
    }

    /// Returns epoch milliseconds.
    #[must_use]
    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Returns the underlying chrono value.
    #[must_use]
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Parses any of the accepted textual formats.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self::truncated(dt.with_timezone(&Utc)));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
            return Ok(Self::truncated(naive.and_utc()));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
            return Ok(Self::truncated(naive.and_utc()));
        }
        if let Some(midnight) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return Ok(Self(midnight.and_utc()));
        }
        Err(crate::Error::InvalidTimestamp(s.to_string()))
    }

    /// Reads a timestamp from a JSON string or integer.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::parse(s).ok(),
            Value::Number(n) => n.as_i64().and_then(Self::from_millis),
            _ => None,
        }
    }

    /// Formats as ISO-8601 with milliseconds and a `Z` suffix.
    #[must_use]
    pub fn to_iso_string(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Returns the next timestamp for a write that supersedes `self`.
    ///
    /// This is the current time when the clock has moved past `self`,
    /// otherwise `self` plus one millisecond, so a local edit always
    /// outranks the version it replaced. `None` when `self` is already the
    /// last representable instant.
    #[must_use]
    pub fn tick(&self) -> Option<Self> {
        let now = Self::now();
        if now > *self { Some(now) } else { self.plus_millis(1) }
    }

    /// Returns this timestamp shifted by `millis` (negative moves back), or
    /// `None` if the result falls outside the representable range.
    #[must_use]
    pub fn plus_millis(&self, millis: i64) -> Option<Self> {
        let delta = TimeDelta::try_milliseconds(millis)?;
        self.0.checked_add_signed(delta).map(Self)
    }

    fn truncated(dt: DateTime<Utc>) -> Self {
        DateTime::from_timestamp_millis(dt.timestamp_millis())
            .map(Self)
            .unwrap_or(Self(dt))
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso_string())
    }
}

impl FromStr for Timestamp {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self::truncated(value)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso_string())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {value}")))
    }
}
