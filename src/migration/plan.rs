//! Migration planning.
//!
//! Two strategies decide which registered migrations still have to run:
//!
//! - **new migrations**: everything strictly newer than the latest applied
//!   version. Safe for production.
//! - **non-applied migrations**: everything whose version is missing from
//!   the applied history, including versions older than the latest one.
//!   Meant for development, where branches merge migrations "in the past";
//!   such migrations may conflict with later ones that assumed their absence.

use super::registry::MigrationRegistry;
use super::types::{ConfigurationError, MigrationInfo, PendingMigration};
use crate::session::SessionFactory;
use crate::version::Version;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Failed to read migration state: {0:#}")]
    Backend(anyhow::Error),
}

/// Snapshot of what is applied and what is pending.
pub struct MigrationPlan<V, C> {
    current_version_info: Option<MigrationInfo<V>>,
    pending_migrations: Vec<PendingMigration<V, C>>,
}

impl<V, C> MigrationPlan<V, C> {
    pub fn new(
        current_version_info: Option<MigrationInfo<V>>,
        pending_migrations: Vec<PendingMigration<V, C>>,
    ) -> Self {
        Self {
            current_version_info,
            pending_migrations,
        }
    }

    /// A plan with no history and nothing to apply.
    pub fn empty() -> Self {
        Self::new(None, Vec::new())
    }

    /// Latest applied migration, if any.
    pub fn current_version_info(&self) -> Option<&MigrationInfo<V>> {
        self.current_version_info.as_ref()
    }

    /// Pending migrations in ascending version order.
    pub fn pending_migrations(&self) -> &[PendingMigration<V, C>] {
        &self.pending_migrations
    }

    pub fn has_pending_migrations(&self) -> bool {
        !self.pending_migrations.is_empty()
    }

    pub fn pending_versions(&self) -> Vec<&V> {
        self.pending_migrations.iter().map(|p| &p.version).collect()
    }

    pub fn into_pending_migrations(self) -> Vec<PendingMigration<V, C>> {
        self.pending_migrations
    }
}

impl<V: Clone, C> Clone for MigrationPlan<V, C> {
    fn clone(&self) -> Self {
        Self {
            current_version_info: self.current_version_info.clone(),
            pending_migrations: self.pending_migrations.clone(),
        }
    }
}

impl<V: fmt::Debug, C> fmt::Debug for MigrationPlan<V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationPlan")
            .field("current_version_info", &self.current_version_info)
            .field("pending_migrations", &self.pending_migrations)
            .finish()
    }
}

/// Plan every migration newer than `current`.
pub fn plan_new_migrations<V, C>(
    registry: &MigrationRegistry<C>,
    current: Option<MigrationInfo<V>>,
) -> Result<MigrationPlan<V, C>, ConfigurationError>
where
    V: Version,
    C: Send + 'static,
{
    if registry.is_empty() {
        return Ok(MigrationPlan::empty());
    }

    let discovered = registry.discover::<V>()?;

    // BTreeMap iteration is ascending, which is the apply order.
    let pending = discovered
        .into_iter()
        .filter(|(version, _)| match &current {
            Some(info) => version > &info.version,
            None => true,
        })
        .map(|(version, migration_type)| PendingMigration::new(version, migration_type))
        .collect();

    Ok(MigrationPlan::new(current, pending))
}

/// Plan every migration whose version is absent from `applied`.
///
/// Fails when two applied records share a version, which indicates a
/// corrupted history.
pub fn plan_non_applied_migrations<V, C>(
    registry: &MigrationRegistry<C>,
    applied: Vec<MigrationInfo<V>>,
) -> Result<MigrationPlan<V, C>, ConfigurationError>
where
    V: Version,
    C: Send + 'static,
{
    if registry.is_empty() {
        return Ok(MigrationPlan::empty());
    }

    let mut applied_versions: BTreeMap<V, String> = BTreeMap::new();
    for info in &applied {
        match applied_versions.entry(info.version.clone()) {
            Entry::Occupied(existing) => {
                return Err(ConfigurationError::DuplicateAppliedVersion {
                    version: info.version.to_string(),
                    first: existing.get().clone(),
                    second: info.name.clone(),
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(info.name.clone());
            }
        }
    }

    // Reported as the current version only; filtering uses the full set.
    let current = applied.into_iter().max_by(|a, b| a.version.cmp(&b.version));

    let discovered = registry.discover::<V>()?;
    let pending = discovered
        .into_iter()
        .filter(|(version, _)| !applied_versions.contains_key(version))
        .map(|(version, migration_type)| PendingMigration::new(version, migration_type))
        .collect();

    Ok(MigrationPlan::new(current, pending))
}

/// Builds plans by reading the target's state through a session factory.
pub struct PlanBuilder<'a, V, C>
where
    V: Version,
    C: Send + 'static,
{
    registry: &'a MigrationRegistry<C>,
    sessions: &'a dyn SessionFactory<V, C>,
}

impl<'a, V, C> PlanBuilder<'a, V, C>
where
    V: Version,
    C: Send + 'static,
{
    pub fn new(registry: &'a MigrationRegistry<C>, sessions: &'a dyn SessionFactory<V, C>) -> Self {
        Self { registry, sessions }
    }

    /// Plan against the latest applied version.
    pub async fn new_migrations(&self) -> Result<MigrationPlan<V, C>, PlanError> {
        if self.registry.is_empty() {
            debug!("No migrations registered");
            return Ok(MigrationPlan::empty());
        }

        let mut session = self
            .sessions
            .open_latest_info_session()
            .await
            .map_err(PlanError::Backend)?;
        let latest = session.latest_migration_info().await;
        if let Err(e) = session.close().await {
            warn!(error = %e, "Failed to close latest-info session");
        }
        let latest = latest.map_err(PlanError::Backend)?;

        let plan = plan_new_migrations(self.registry, latest)?;
        log_plan("new", &plan);
        Ok(plan)
    }

    /// Plan against the complete applied history.
    pub async fn non_applied_migrations(&self) -> Result<MigrationPlan<V, C>, PlanError> {
        if self.registry.is_empty() {
            debug!("No migrations registered");
            return Ok(MigrationPlan::empty());
        }

        let mut session = self
            .sessions
            .open_all_infos_session()
            .await
            .map_err(PlanError::Backend)?;
        let applied = session.all_migration_infos().await;
        if let Err(e) = session.close().await {
            warn!(error = %e, "Failed to close all-infos session");
        }
        let applied = applied.map_err(PlanError::Backend)?;

        let plan = plan_non_applied_migrations(self.registry, applied)?;
        log_plan("non-applied", &plan);
        Ok(plan)
    }
}

fn log_plan<V: Version, C>(strategy: &str, plan: &MigrationPlan<V, C>) {
    let current = plan
        .current_version_info()
        .map(|i| i.version.to_string())
        .unwrap_or_else(|| "none".to_string());

    info!(
        strategy,
        current = %current,
        pending = plan.pending_migrations().len(),
        "Built migration plan"
    );
}
