//! Migration engine: discovery, planning and execution behind one type.

use super::executor::{InfoFactory, MigrationExecutor, UnitFactory};
use super::plan::{MigrationPlan, PlanBuilder, PlanError};
use super::registry::MigrationRegistry;
use super::summary::MigrationSummary;
use crate::session::SessionFactory;
use crate::version::Version;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// How pending migrations are selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MigrationApproach {
    /// Migrations newer than the latest applied version. Production default.
    #[default]
    NewMigrations,
    /// Every migration missing from the applied history, older ones
    /// included. Development only.
    NonAppliedMigrations,
}

impl fmt::Display for MigrationApproach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationApproach::NewMigrations => write!(f, "new"),
            MigrationApproach::NonAppliedMigrations => write!(f, "non-applied"),
        }
    }
}

impl FromStr for MigrationApproach {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" | "newMigrations" => Ok(MigrationApproach::NewMigrations),
            "non-applied" | "nonAppliedMigrations" => Ok(MigrationApproach::NonAppliedMigrations),
            other => Err(format!(
                "Unknown migration approach '{}', expected 'new' or 'non-applied'",
                other
            )),
        }
    }
}

/// Plans and applies the migrations of one registry against one target.
///
/// Migration failures are reported in the returned [`MigrationSummary`];
/// only failures while reading the target's state or discovering migrations
/// are returned as errors.
pub struct MigrationEngine<V, C>
where
    V: Version,
    C: Send + 'static,
{
    registry: Arc<MigrationRegistry<C>>,
    sessions: Arc<dyn SessionFactory<V, C>>,
    executor: MigrationExecutor<V, C>,
}

impl<V, C> MigrationEngine<V, C>
where
    V: Version,
    C: Send + 'static,
{
    pub fn new(
        registry: Arc<MigrationRegistry<C>>,
        sessions: Arc<dyn SessionFactory<V, C>>,
    ) -> Self {
        let executor = MigrationExecutor::new(Arc::clone(&sessions));
        Self {
            registry,
            sessions,
            executor,
        }
    }

    pub fn with_unit_factory(mut self, units: Arc<dyn UnitFactory<C>>) -> Self {
        self.executor = self.executor.with_unit_factory(units);
        self
    }

    pub fn with_info_factory(mut self, info_factory: InfoFactory<V, C>) -> Self {
        self.executor = self.executor.with_info_factory(info_factory);
        self
    }

    pub fn with_cancellation(mut self, cancellation: watch::Receiver<bool>) -> Self {
        self.executor = self.executor.with_cancellation(cancellation);
        self
    }

    pub fn registry(&self) -> &MigrationRegistry<C> {
        &self.registry
    }

    /// Plan migrations newer than the latest applied one.
    pub async fn plan_for_new_migrations(&self) -> Result<MigrationPlan<V, C>, PlanError> {
        self.plan_builder().new_migrations().await
    }

    /// Plan every migration not yet applied, including older ones.
    pub async fn plan_for_non_applied_migrations(&self) -> Result<MigrationPlan<V, C>, PlanError> {
        self.plan_builder().non_applied_migrations().await
    }

    /// Plan with the given approach.
    pub async fn plan(
        &self,
        approach: MigrationApproach,
    ) -> Result<MigrationPlan<V, C>, PlanError> {
        match approach {
            MigrationApproach::NewMigrations => self.plan_for_new_migrations().await,
            MigrationApproach::NonAppliedMigrations => self.plan_for_non_applied_migrations().await,
        }
    }

    /// Plan with `approach` and apply the pending migrations, stamping
    /// records with `now`.
    pub async fn migrate(
        &self,
        now: DateTime<Utc>,
        approach: MigrationApproach,
    ) -> Result<MigrationSummary<V>, PlanError> {
        info!(approach = %approach, "Starting migration");

        let plan = self.plan(approach).await?;
        Ok(self.executor.apply(plan.pending_migrations(), now).await)
    }

    fn plan_builder(&self) -> PlanBuilder<'_, V, C> {
        PlanBuilder::new(&self.registry, self.sessions.as_ref())
    }
}
