//! Version capability shared by every version encoding.

use std::fmt;
use thiserror::Error;

/// Error types for version operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version format: {0}")]
    InvalidFormat(String),

    #[error("Version field out of range in {0}")]
    FieldOutOfRange(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid field count {0}: must be between 1 and 4")]
    InvalidFieldCount(usize),
}

/// A totally ordered migration key.
///
/// A value of an implementing type only exists once its literal has been
/// parsed successfully, so comparison and sorting never see a malformed
/// version.
pub trait Version: Ord + Clone + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Interpret a version literal as declared on a migration.
    fn parse_literal(literal: &str) -> Result<Self, VersionError>;
}
