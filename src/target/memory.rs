//! In-process target system.

use crate::migration::{Migration, MigrationInfo};
use crate::session::{AllInfosSession, LatestInfoSession, MigrationSession, SessionFactory};
use crate::version::Version;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

struct Shared<V, S> {
    state: S,
    journal: Vec<MigrationInfo<V>>,
}

/// Target whose state is a value of type `S` held in memory.
///
/// Migrations receive a working copy of the state. A commit publishes the
/// copy together with the staged history record. A migration that does not
/// require a transaction has its copy published when the session closes,
/// even without a commit; its record is still only written by a commit.
pub struct MemoryTarget<V, S> {
    inner: Arc<Mutex<Shared<V, S>>>,
}

impl<V, S> MemoryTarget<V, S>
where
    V: Version,
    S: Clone + Default + Send + 'static,
{
    pub fn new() -> Self {
        Self::with_history(S::default(), Vec::new())
    }

    /// Start from existing state and history.
    pub fn with_history(state: S, journal: Vec<MigrationInfo<V>>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Shared { state, journal })),
        }
    }

    /// Copy of the published state.
    pub async fn state(&self) -> S {
        self.inner.lock().await.state.clone()
    }

    /// Copy of the history, in the order records were committed.
    pub async fn journal(&self) -> Vec<MigrationInfo<V>> {
        self.inner.lock().await.journal.clone()
    }
}

impl<V, S> Default for MemoryTarget<V, S>
where
    V: Version,
    S: Clone + Default + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V, S> Clone for MemoryTarget<V, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct MemoryReadSession<V, S> {
    inner: Arc<Mutex<Shared<V, S>>>,
}

#[async_trait]
impl<V, S> LatestInfoSession<V> for MemoryReadSession<V, S>
where
    V: Version,
    S: Send + 'static,
{
    async fn latest_migration_info(&mut self) -> anyhow::Result<Option<MigrationInfo<V>>> {
        let shared = self.inner.lock().await;
        Ok(shared
            .journal
            .iter()
            .max_by(|a, b| a.version.cmp(&b.version))
            .cloned())
    }
}

#[async_trait]
impl<V, S> AllInfosSession<V> for MemoryReadSession<V, S>
where
    V: Version,
    S: Send + 'static,
{
    async fn all_migration_infos(&mut self) -> anyhow::Result<Vec<MigrationInfo<V>>> {
        Ok(self.inner.lock().await.journal.clone())
    }
}

struct MemoryMigrationSession<V, S> {
    inner: Arc<Mutex<Shared<V, S>>>,
    working: S,
    staged: Vec<MigrationInfo<V>>,
    transactional: bool,
    committed: bool,
}

#[async_trait]
impl<V, S> MigrationSession<V, S> for MemoryMigrationSession<V, S>
where
    V: Version,
    S: Clone + Send + 'static,
{
    fn context(&mut self) -> &mut S {
        &mut self.working
    }

    async fn store_info(&mut self, info: MigrationInfo<V>) -> anyhow::Result<()> {
        self.staged.push(info);
        Ok(())
    }

    async fn commit(&mut self) -> anyhow::Result<()> {
        let mut shared = self.inner.lock().await;
        shared.state = self.working.clone();
        shared.journal.append(&mut self.staged);
        self.committed = true;
        Ok(())
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        if !self.committed && !self.transactional {
            debug!("Publishing uncommitted changes of non-transactional migration");
            self.inner.lock().await.state = self.working.clone();
        }
        Ok(())
    }
}

#[async_trait]
impl<V, S> SessionFactory<V, S> for MemoryTarget<V, S>
where
    V: Version,
    S: Clone + Default + Send + 'static,
{
    async fn open_latest_info_session(&self) -> anyhow::Result<Box<dyn LatestInfoSession<V>>> {
        Ok(Box::new(MemoryReadSession {
            inner: Arc::clone(&self.inner),
        }))
    }

    async fn open_all_infos_session(&self) -> anyhow::Result<Box<dyn AllInfosSession<V>>> {
        Ok(Box::new(MemoryReadSession {
            inner: Arc::clone(&self.inner),
        }))
    }

    async fn open_migration_session(
        &self,
        migration: &dyn Migration<S>,
    ) -> anyhow::Result<Box<dyn MigrationSession<V, S>>> {
        let working = self.inner.lock().await.state.clone();
        Ok(Box::new(MemoryMigrationSession {
            inner: Arc::clone(&self.inner),
            working,
            staged: Vec::new(),
            transactional: migration.requires_transaction(),
            committed: false,
        }))
    }
}
