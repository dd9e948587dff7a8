pub mod config;
pub mod migration;
pub mod session;
pub mod target;
pub mod utils;
pub mod version;

// Re-export commonly used types
pub use config::{read_config, write_config, ConfigError, MigratorConfig, VersionFormat};
pub use migration::{
    Candidate, ConfigurationError, Migration, MigrationApproach, MigrationEngine, MigrationError,
    MigrationExecutor, MigrationInfo, MigrationPlan, MigrationRegistry, MigrationSummary,
    MigrationType, PendingMigration, PlanError,
};
pub use session::{AllInfosSession, LatestInfoSession, MigrationSession, SessionFactory};
pub use target::{DirectoryContext, DirectoryTarget, Journal, MemoryTarget, TargetError};
pub use version::{compare_versions, DottedVersion, TimestampVersion, Version, VersionError};
