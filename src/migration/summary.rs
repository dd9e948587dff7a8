//! Outcome of applying a plan.

use super::types::MigrationInfo;
use std::error::Error as StdError;
use std::fmt;

/// Failure of a single migration during the apply phase.
///
/// Two errors are equal when they refer to the same version, whatever the
/// underlying cause.
pub struct MigrationError<V> {
    version: V,
    cause: anyhow::Error,
}

impl<V> MigrationError<V> {
    pub fn new(version: V, cause: anyhow::Error) -> Self {
        Self { version, cause }
    }

    /// Version of the migration that failed.
    pub fn version(&self) -> &V {
        &self.version
    }

    /// What went wrong while instantiating, applying, storing or committing.
    pub fn cause(&self) -> &anyhow::Error {
        &self.cause
    }

    pub fn into_cause(self) -> anyhow::Error {
        self.cause
    }
}

impl<V: fmt::Display> fmt::Display for MigrationError<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Migration {} failed: {:#}", self.version, self.cause)
    }
}

impl<V: fmt::Debug> fmt::Debug for MigrationError<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationError")
            .field("version", &self.version)
            .field("cause", &self.cause)
            .finish()
    }
}

impl<V: fmt::Debug + fmt::Display> StdError for MigrationError<V> {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.cause)
    }
}

impl<V: PartialEq> PartialEq for MigrationError<V> {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}

impl<V: Eq> Eq for MigrationError<V> {}

/// Result of one apply run: the migrations applied, in order, and the
/// error that stopped the run if there was one.
///
/// Without an error the list holds every pending migration of the plan;
/// with an error it holds the prefix applied before the failing one.
#[derive(Debug)]
pub struct MigrationSummary<V> {
    applied_migrations: Vec<MigrationInfo<V>>,
    error: Option<MigrationError<V>>,
}

impl<V> MigrationSummary<V> {
    /// Summary of a run with nothing to apply.
    pub fn empty() -> Self {
        Self {
            applied_migrations: Vec::new(),
            error: None,
        }
    }

    pub fn succeeded(applied_migrations: Vec<MigrationInfo<V>>) -> Self {
        Self {
            applied_migrations,
            error: None,
        }
    }

    pub fn failed(applied_migrations: Vec<MigrationInfo<V>>, error: MigrationError<V>) -> Self {
        Self {
            applied_migrations,
            error: Some(error),
        }
    }

    pub fn applied_migrations(&self) -> &[MigrationInfo<V>] {
        &self.applied_migrations
    }

    pub fn error(&self) -> Option<&MigrationError<V>> {
        self.error.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Turn a failed run back into an error; a successful run yields the
    /// applied records.
    pub fn ensure_success(self) -> Result<Vec<MigrationInfo<V>>, MigrationError<V>> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.applied_migrations),
        }
    }

    /// Split into the applied records and the optional error.
    pub fn into_parts(self) -> (Vec<MigrationInfo<V>>, Option<MigrationError<V>>) {
        (self.applied_migrations, self.error)
    }
}

impl<V> Default for MigrationSummary<V> {
    fn default() -> Self {
        Self::empty()
    }
}
