//! Dotted numeric versions (major.minor.build.revision).

use super::types::{Version, VersionError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// One to four dot-separated decimal fields.
static DOTTED_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+(\.[0-9]+){0,3}$").expect("static pattern is valid"));

/// Highest number of fields a dotted version can carry.
pub const MAX_FIELDS: usize = 4;

/// A version made of up to four numeric fields.
///
/// Fields are compared numerically, one by one, so `1.10.0` sorts after
/// `1.2.0`. Fields missing from the literal are zero. The display field
/// count only controls how many fields are rendered as text; equality and
/// ordering always use all four fields.
#[derive(Debug, Clone, Copy)]
pub struct DottedVersion {
    fields: [u32; MAX_FIELDS],
    field_count: usize,
}

impl DottedVersion {
    /// Create a three-field version (major.minor.build).
    pub fn new(major: u32, minor: u32, build: u32) -> Self {
        Self {
            fields: [major, minor, build, 0],
            field_count: 3,
        }
    }

    /// Create a version from 1 to 4 fields; the display count is the number
    /// of fields given.
    pub fn from_fields(fields: &[u32]) -> Result<Self, VersionError> {
        if fields.is_empty() || fields.len() > MAX_FIELDS {
            return Err(VersionError::InvalidFieldCount(fields.len()));
        }

        let mut all = [0; MAX_FIELDS];
        all[..fields.len()].copy_from_slice(fields);

        Ok(Self {
            fields: all,
            field_count: fields.len(),
        })
    }

    /// Parse a literal such as `"1.2"` or `"1.2.3.4"`.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        if !DOTTED_PATTERN.is_match(s) {
            return Err(VersionError::InvalidFormat(s.to_string()));
        }

        let mut fields = Vec::with_capacity(MAX_FIELDS);
        for part in s.split('.') {
            let value: u32 = part
                .parse()
                .map_err(|_| VersionError::FieldOutOfRange(s.to_string()))?;
            fields.push(value);
        }

        Self::from_fields(&fields)
    }

    /// Same value, rendered with `count` fields.
    pub fn with_field_count(self, count: usize) -> Result<Self, VersionError> {
        if !(1..=MAX_FIELDS).contains(&count) {
            return Err(VersionError::InvalidFieldCount(count));
        }
        Ok(Self {
            field_count: count,
            ..self
        })
    }

    pub fn major(&self) -> u32 {
        self.fields[0]
    }

    pub fn minor(&self) -> u32 {
        self.fields[1]
    }

    pub fn build(&self) -> u32 {
        self.fields[2]
    }

    pub fn revision(&self) -> u32 {
        self.fields[3]
    }

    /// Number of fields rendered by `Display`.
    pub fn field_count(&self) -> usize {
        self.field_count
    }

    /// All four fields, including the ones hidden from the text form.
    pub fn fields(&self) -> [u32; MAX_FIELDS] {
        self.fields
    }
}

impl Version for DottedVersion {
    fn parse_literal(literal: &str) -> Result<Self, VersionError> {
        Self::parse(literal)
    }
}

impl FromStr for DottedVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DottedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields[..self.field_count].iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", field)?;
        }
        Ok(())
    }
}

impl PartialEq for DottedVersion {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Eq for DottedVersion {}

impl Hash for DottedVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fields.hash(state);
    }
}

impl Ord for DottedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // Arrays compare element-wise, which is field-wise numeric order.
        self.fields.cmp(&other.fields)
    }
}

impl PartialOrd for DottedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for DottedVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DottedVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
