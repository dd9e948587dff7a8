//! Migration planning and execution.
//!
//! # Overview
//!
//! - Migrations are registered in a `MigrationRegistry`, each with a version
//! - Discovery validates versions and rejects duplicates
//! - A `MigrationPlan` lists the migrations still to apply, in version order
//! - The `MigrationExecutor` applies them one by one, each in its own session,
//!   and stops at the first failure
//! - The `MigrationEngine` ties the three together
//!
//! # Usage
//!
//! ```ignore
//! let mut registry = MigrationRegistry::default();
//! registry
//!     .register_migration::<CreateUsers>("0.1.0")
//!     .register_migration::<AddEmail>("0.2.0");
//!
//! let engine: MigrationEngine<DottedVersion, _> =
//!     MigrationEngine::new(Arc::new(registry), Arc::new(target));
//! let summary = engine.migrate(Utc::now(), MigrationApproach::NewMigrations).await?;
//! summary.ensure_success()?;
//! ```

mod engine;
mod executor;
mod plan;
mod registry;
mod summary;
mod types;

pub use engine::{MigrationApproach, MigrationEngine};
pub use executor::{
    default_info_factory, ConstructorUnitFactory, InfoFactory, MigrationExecutor, UnitFactory,
};
pub use plan::{
    plan_new_migrations, plan_non_applied_migrations, MigrationPlan, PlanBuilder, PlanError,
};
pub use registry::{find_migrations, Candidate, MigrationRegistry, Visibility, DEFAULT_FAMILY};
pub use summary::{MigrationError, MigrationSummary};
pub use types::{
    ConfigurationError, Constructor, Migration, MigrationDescriptor, MigrationInfo, MigrationType,
    PendingMigration,
};
