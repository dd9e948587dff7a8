//! Versions derived from UTC timestamps.

use super::codec::{format_timestamp, try_parse_timestamp, CalendarFields};
use super::types::{Version, VersionError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A version whose value is the weighted integer form of a UTC timestamp,
/// e.g. `2021-09-06T16:45Z` is `20210906164500`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct TimestampVersion(i64);

impl TimestampVersion {
    /// Parse `YYYY-MM-DDTHH:MMZ` or `YYYY-MM-DDTHH:MM:SSZ`.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        try_parse_timestamp(s)
            .map(Self)
            .ok_or_else(|| VersionError::InvalidTimestamp(s.to_string()))
    }

    /// Wrap an already weighted integer, checking it decodes to a real instant.
    pub fn from_value(value: i64) -> Result<Self, VersionError> {
        CalendarFields::from_timestamp(value)
            .map(|_| Self(value))
            .ok_or_else(|| VersionError::InvalidTimestamp(value.to_string()))
    }

    /// Build from calendar fields.
    pub fn from_fields(fields: CalendarFields) -> Result<Self, VersionError> {
        fields
            .to_timestamp()
            .map(Self)
            .ok_or_else(|| VersionError::InvalidTimestamp(format!("{:?}", fields)))
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn fields(&self) -> CalendarFields {
        // Construction guarantees a decodable value.
        CalendarFields::from_timestamp(self.0).unwrap_or(CalendarFields {
            year: 1,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
        })
    }
}

impl Version for TimestampVersion {
    fn parse_literal(literal: &str) -> Result<Self, VersionError> {
        Self::parse(literal)
    }
}

impl FromStr for TimestampVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<i64> for TimestampVersion {
    type Error = VersionError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<TimestampVersion> for i64 {
    fn from(version: TimestampVersion) -> Self {
        version.0
    }
}

impl fmt::Display for TimestampVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match format_timestamp(self.0) {
            Some(text) => f.write_str(&text),
            None => write!(f, "{}", self.0),
        }
    }
}
