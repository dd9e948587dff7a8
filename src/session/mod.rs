//! Collaborator roles a target system implements.
//!
//! The engine never talks to a storage engine directly. It opens sessions
//! through a [`SessionFactory`]: short-lived read sessions while planning,
//! and one session per migration while applying. Every session is closed
//! before the next one is opened.

use crate::migration::{Migration, MigrationInfo};
use crate::version::Version;
use async_trait::async_trait;

/// Reads the most recently applied migration.
#[async_trait]
pub trait LatestInfoSession<V: Version>: Send {
    /// The record with the highest version, or `None` when nothing has been
    /// applied yet.
    async fn latest_migration_info(&mut self) -> anyhow::Result<Option<MigrationInfo<V>>>;

    /// Release the session.
    async fn close(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Reads the complete migration history.
#[async_trait]
pub trait AllInfosSession<V: Version>: Send {
    /// Every applied record. A target whose history store does not exist
    /// yet returns an empty list rather than an error.
    async fn all_migration_infos(&mut self) -> anyhow::Result<Vec<MigrationInfo<V>>>;

    /// Release the session.
    async fn close(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Session scoped to applying exactly one migration.
#[async_trait]
pub trait MigrationSession<V, C>: Send
where
    V: Version,
    C: Send,
{
    /// Execution context handed to the migration.
    fn context(&mut self) -> &mut C;

    /// Stage the history record of the migration being applied.
    async fn store_info(&mut self, info: MigrationInfo<V>) -> anyhow::Result<()>;

    /// Make the migration's changes and its record durable.
    async fn commit(&mut self) -> anyhow::Result<()>;

    /// Release the session. Uncommitted transactional work is discarded.
    async fn close(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Opens sessions against a target system.
#[async_trait]
pub trait SessionFactory<V, C>: Send + Sync
where
    V: Version,
    C: Send,
{
    async fn open_latest_info_session(&self) -> anyhow::Result<Box<dyn LatestInfoSession<V>>>;

    async fn open_all_infos_session(&self) -> anyhow::Result<Box<dyn AllInfosSession<V>>>;

    /// Open the session for `migration`. The factory decides from
    /// [`Migration::requires_transaction`] whether to open a transaction.
    async fn open_migration_session(
        &self,
        migration: &dyn Migration<C>,
    ) -> anyhow::Result<Box<dyn MigrationSession<V, C>>>;
}
