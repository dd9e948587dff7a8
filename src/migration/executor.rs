//! Migration executor for running migrations.

use super::summary::{MigrationError, MigrationSummary};
use super::types::{Migration, MigrationInfo, MigrationType, PendingMigration};
use crate::session::{MigrationSession, SessionFactory};
use crate::version::Version;
use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Instantiates migration units right before they are applied.
pub trait UnitFactory<C>: Send + Sync
where
    C: Send,
{
    fn create(&self, migration_type: &MigrationType<C>) -> anyhow::Result<Box<dyn Migration<C>>>;
}

/// Unit factory that calls the constructor registered with the migration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstructorUnitFactory;

impl<C> UnitFactory<C> for ConstructorUnitFactory
where
    C: Send,
{
    fn create(&self, migration_type: &MigrationType<C>) -> anyhow::Result<Box<dyn Migration<C>>> {
        migration_type
            .instantiate()
            .with_context(|| format!("Failed to create migration {}", migration_type.type_name()))
    }
}

/// Builds the history record of a migration that was just applied.
pub type InfoFactory<V, C> =
    Arc<dyn Fn(&V, &dyn Migration<C>, DateTime<Utc>) -> MigrationInfo<V> + Send + Sync>;

/// Record the version, the migration's name and the applied-at time.
pub fn default_info_factory<V, C>() -> InfoFactory<V, C>
where
    V: Version,
    C: Send + 'static,
{
    Arc::new(
        |version: &V, migration: &dyn Migration<C>, applied_at: DateTime<Utc>| {
            MigrationInfo::new(version.clone(), migration.name(), applied_at)
        },
    )
}

/// Executor for running migrations.
///
/// Pending migrations are applied one at a time in the order given. Each
/// one gets a fresh unit instance and its own session; the session is
/// committed after the unit is applied and its record stored. The first
/// failure stops the run. Migrations committed before it stay committed.
pub struct MigrationExecutor<V, C>
where
    V: Version,
    C: Send + 'static,
{
    sessions: Arc<dyn SessionFactory<V, C>>,
    units: Arc<dyn UnitFactory<C>>,
    info_factory: InfoFactory<V, C>,
    cancellation: Option<watch::Receiver<bool>>,
}

impl<V, C> MigrationExecutor<V, C>
where
    V: Version,
    C: Send + 'static,
{
    /// Create a new executor opening sessions from `sessions`.
    pub fn new(sessions: Arc<dyn SessionFactory<V, C>>) -> Self {
        Self {
            sessions,
            units: Arc::new(ConstructorUnitFactory),
            info_factory: default_info_factory(),
            cancellation: None,
        }
    }

    pub fn with_unit_factory(mut self, units: Arc<dyn UnitFactory<C>>) -> Self {
        self.units = units;
        self
    }

    pub fn with_info_factory(mut self, info_factory: InfoFactory<V, C>) -> Self {
        self.info_factory = info_factory;
        self
    }

    /// Stop the run when `true` is sent on the channel. The migration in
    /// flight is abandoned without a commit and reported as failed.
    pub fn with_cancellation(mut self, cancellation: watch::Receiver<bool>) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    /// Apply `pending` in order, stamping records with `now`.
    pub async fn apply(
        &self,
        pending: &[PendingMigration<V, C>],
        now: DateTime<Utc>,
    ) -> MigrationSummary<V> {
        if pending.is_empty() {
            info!("No pending migrations");
            return MigrationSummary::empty();
        }

        info!(count = pending.len(), "Applying migrations");

        let mut applied = Vec::with_capacity(pending.len());

        for migration in pending {
            let type_name = migration.migration_type.type_name();

            if self.is_cancelled() {
                warn!(
                    version = %migration.version,
                    migration = %type_name,
                    "Run cancelled before migration"
                );
                return MigrationSummary::failed(
                    applied,
                    MigrationError::new(migration.version.clone(), anyhow!("migration cancelled")),
                );
            }

            info!(version = %migration.version, migration = %type_name, "Applying migration");

            match self.apply_one(migration, now).await {
                Ok(record) => {
                    info!(
                        version = %migration.version,
                        migration = %type_name,
                        "Migration committed"
                    );
                    applied.push(record);
                }
                Err(cause) => {
                    error!(
                        version = %migration.version,
                        migration = %type_name,
                        error = %format!("{:#}", cause),
                        "Migration failed"
                    );
                    return MigrationSummary::failed(
                        applied,
                        MigrationError::new(migration.version.clone(), cause),
                    );
                }
            }
        }

        info!(count = applied.len(), "Migrations applied successfully");
        MigrationSummary::succeeded(applied)
    }

    async fn apply_one(
        &self,
        pending: &PendingMigration<V, C>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<MigrationInfo<V>> {
        let mut unit = self.units.create(&pending.migration_type)?;

        let opened = self
            .cancellable(self.sessions.open_migration_session(unit.as_ref()))
            .await;
        let mut session = match opened {
            Ok(session) => session,
            Err(e) => {
                release_unit(unit.as_mut(), &pending.version).await;
                return Err(e.context("Failed to open migration session"));
            }
        };

        let result = self
            .cancellable(apply_and_commit(
                session.as_mut(),
                &pending.version,
                unit.as_ref(),
                &self.info_factory,
                now,
            ))
            .await;

        // Unit first, then the session, whatever the outcome.
        release_unit(unit.as_mut(), &pending.version).await;
        if let Err(e) = session.close().await {
            warn!(version = %pending.version, error = %e, "Failed to close migration session");
        }

        result
    }

    async fn cancellable<T>(
        &self,
        work: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        let Some(receiver) = &self.cancellation else {
            return work.await;
        };
        let mut receiver = receiver.clone();

        tokio::select! {
            result = work => result,
            _ = wait_for_cancel(&mut receiver) => Err(anyhow!("migration cancelled")),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .map(|receiver| *receiver.borrow())
            .unwrap_or(false)
    }
}

async fn apply_and_commit<V, C>(
    session: &mut dyn MigrationSession<V, C>,
    version: &V,
    unit: &dyn Migration<C>,
    info_factory: &InfoFactory<V, C>,
    now: DateTime<Utc>,
) -> anyhow::Result<MigrationInfo<V>>
where
    V: Version,
    C: Send + 'static,
{
    unit.apply(session.context())
        .await
        .context("Migration apply failed")?;

    let record = info_factory(version, unit, now);
    debug!(version = %version, name = %record.name, "Storing migration info");

    session
        .store_info(record.clone())
        .await
        .context("Failed to store migration info")?;
    session
        .commit()
        .await
        .context("Failed to commit migration")?;

    Ok(record)
}

async fn release_unit<V: Version, C: Send>(unit: &mut dyn Migration<C>, version: &V) {
    if let Err(e) = unit.release().await {
        warn!(version = %version, error = %e, "Failed to release migration");
    }
}

/// Resolve once `true` is observed. A dropped sender never cancels.
async fn wait_for_cancel(receiver: &mut watch::Receiver<bool>) {
    loop {
        if *receiver.borrow_and_update() {
            return;
        }
        if receiver.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
