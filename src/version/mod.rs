//! Version model for migrations.
//!
//! Every migration carries one version; versions decide both the order in
//! which migrations are applied and whether a migration has already been
//! applied. Two encodings are provided:
//!
//! - [`DottedVersion`]: up to four numeric fields compared field by field
//! - [`TimestampVersion`]: a UTC timestamp folded into a sortable integer

mod codec;
mod dotted;
mod timestamp;
mod types;

pub use codec::{
    days_in_month, format_timestamp, is_leap_year, parse_timestamp_or_zero, try_parse_timestamp,
    CalendarFields,
};
pub use dotted::{DottedVersion, MAX_FIELDS};
pub use timestamp::TimestampVersion;
pub use types::{Version, VersionError};

use std::cmp::Ordering;

/// Compare two versions of the same encoding.
pub fn compare_versions<V: Version>(a: &V, b: &V) -> Ordering {
    a.cmp(b)
}
