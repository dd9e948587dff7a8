//! Types for the migration system.

use crate::utils::short_type_name;
use crate::version::{Version, VersionError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors in how migrations or their recorded history are set up.
///
/// These surface while discovering migrations or building a plan, before
/// anything is applied, and are never retried.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Migration {type_name} declares invalid version '{literal}': {source}")]
    InvalidVersion {
        type_name: String,
        literal: String,
        #[source]
        source: VersionError,
    },

    #[error("Migrations {existing} and {duplicate} both declare version {version}")]
    DuplicateVersion {
        version: String,
        existing: String,
        duplicate: String,
    },

    #[error("Applied migrations '{first}' and '{second}' are both recorded with version {version}")]
    DuplicateAppliedVersion {
        version: String,
        first: String,
        second: String,
    },

    #[error("Version error: {0}")]
    VersionError(#[from] VersionError),
}

/// A single migration unit.
///
/// A unit is applied at most once to a target system. It works against the
/// execution context of the session it is given and must not commit: the
/// executor commits once the unit and its history record are both in place.
#[async_trait]
pub trait Migration<C>: Send + Sync
where
    C: Send,
{
    /// Human-readable name recorded in the migration history.
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Whether the session opened for this unit should be transactional.
    fn requires_transaction(&self) -> bool {
        true
    }

    /// Apply the migration.
    async fn apply(&self, context: &mut C) -> anyhow::Result<()>;

    /// Release resources held by the unit. Called once after the apply
    /// attempt, whatever its outcome.
    async fn release(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Creates a fresh unit instance.
pub type Constructor<C> = Arc<dyn Fn() -> anyhow::Result<Box<dyn Migration<C>>> + Send + Sync>;

/// Reference to a concrete migration definition: its type name and a way
/// to instantiate it on demand.
pub struct MigrationType<C> {
    type_name: String,
    constructor: Constructor<C>,
}

impl<C> MigrationType<C>
where
    C: Send,
{
    pub fn new(type_name: impl Into<String>, constructor: Constructor<C>) -> Self {
        Self {
            type_name: type_name.into(),
            constructor,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Run the registered constructor.
    pub fn instantiate(&self) -> anyhow::Result<Box<dyn Migration<C>>> {
        (self.constructor)()
    }
}

impl<C> Clone for MigrationType<C> {
    fn clone(&self) -> Self {
        Self {
            type_name: self.type_name.clone(),
            constructor: Arc::clone(&self.constructor),
        }
    }
}

impl<C> fmt::Debug for MigrationType<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationType")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Version metadata declared on a migration.
///
/// The literal is kept as written; [`MigrationDescriptor::validate`] turns
/// it into a version or reports which migration declared a bad one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationDescriptor {
    literal: String,
}

impl MigrationDescriptor {
    pub fn new(literal: impl Into<String>) -> Self {
        Self {
            literal: literal.into(),
        }
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }

    /// Interpret the literal for the migration type `owner`.
    pub fn validate<V: Version>(&self, owner: &str) -> Result<V, ConfigurationError> {
        V::parse_literal(&self.literal).map_err(|source| ConfigurationError::InvalidVersion {
            type_name: owner.to_string(),
            literal: self.literal.clone(),
            source,
        })
    }
}

/// Record of one applied migration, owned by the target system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationInfo<V> {
    pub version: V,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

impl<V> MigrationInfo<V> {
    pub fn new(version: V, name: impl Into<String>, applied_at: DateTime<Utc>) -> Self {
        Self {
            version,
            name: name.into(),
            applied_at,
        }
    }
}

/// A migration that has not been applied yet.
///
/// Two pending migrations are the same migration when their versions match.
pub struct PendingMigration<V, C> {
    pub version: V,
    pub migration_type: MigrationType<C>,
}

impl<V, C> PendingMigration<V, C> {
    pub fn new(version: V, migration_type: MigrationType<C>) -> Self {
        Self {
            version,
            migration_type,
        }
    }
}

impl<V: Clone, C> Clone for PendingMigration<V, C> {
    fn clone(&self) -> Self {
        Self {
            version: self.version.clone(),
            migration_type: self.migration_type.clone(),
        }
    }
}

impl<V: fmt::Debug, C> fmt::Debug for PendingMigration<V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingMigration")
            .field("version", &self.version)
            .field("migration_type", &self.migration_type)
            .finish()
    }
}

impl<V: PartialEq, C> PartialEq for PendingMigration<V, C> {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}

impl<V: Eq, C> Eq for PendingMigration<V, C> {}
