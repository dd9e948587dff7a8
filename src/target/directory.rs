use super::journal::{read_journal, write_journal, Journal};
use super::TargetError;
use crate::config::MigratorConfig;
use crate::migration::{Migration, MigrationInfo};
use crate::session::{AllInfosSession, LatestInfoSession, MigrationSession, SessionFactory};
use crate::utils::DEFAULT_JOURNAL_FILE;
use crate::version::Version;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Execution context handed to migrations run against a directory.
#[derive(Debug, Clone)]
pub struct DirectoryContext {
    root: PathBuf,
}

impl DirectoryContext {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `relative` against the root.
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }
}

/// Target that is a directory on disk, with its history in a JSON journal
/// inside it.
///
/// Directories have no transactions: whatever a migration wrote stays even
/// when it fails. The journal itself is replaced atomically on commit.
pub struct DirectoryTarget<V> {
    root: PathBuf,
    journal_file: String,
    lock: Arc<Mutex<()>>,
    _version: PhantomData<fn() -> V>,
}

impl<V> DirectoryTarget<V> {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            journal_file: DEFAULT_JOURNAL_FILE.to_string(),
            lock: Arc::new(Mutex::new(())),
            _version: PhantomData,
        }
    }

    pub fn with_journal_file(mut self, journal_file: impl Into<String>) -> Self {
        self.journal_file = journal_file.into();
        self
    }

    pub fn from_config(root: impl Into<PathBuf>, config: &MigratorConfig) -> Self {
        Self::new(root).with_journal_file(config.journal_file.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn journal_path(&self) -> PathBuf {
        self.root.join(&self.journal_file)
    }

    fn ensure_root(&self) -> Result<(), TargetError> {
        if !self.root.is_dir() {
            return Err(TargetError::NotADirectory(self.root.display().to_string()));
        }
        Ok(())
    }
}

impl<V> DirectoryTarget<V>
where
    V: Version + DeserializeOwned,
{
    /// Current journal, empty when the file does not exist yet.
    pub async fn read_journal(&self) -> Result<Journal<V>, TargetError> {
        self.ensure_root()?;
        Ok(read_journal(&self.journal_path()).await?.unwrap_or_default())
    }
}

impl<V> Clone for DirectoryTarget<V> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            journal_file: self.journal_file.clone(),
            lock: Arc::clone(&self.lock),
            _version: PhantomData,
        }
    }
}

struct JournalReadSession<V> {
    journal: Journal<V>,
}

#[async_trait]
impl<V: Version> LatestInfoSession<V> for JournalReadSession<V> {
    async fn latest_migration_info(&mut self) -> anyhow::Result<Option<MigrationInfo<V>>> {
        Ok(self.journal.latest().cloned())
    }
}

#[async_trait]
impl<V: Version> AllInfosSession<V> for JournalReadSession<V> {
    async fn all_migration_infos(&mut self) -> anyhow::Result<Vec<MigrationInfo<V>>> {
        Ok(std::mem::take(&mut self.journal.migrations))
    }
}

struct DirectorySession<V> {
    context: DirectoryContext,
    journal_path: PathBuf,
    lock: Arc<Mutex<()>>,
    staged: Vec<MigrationInfo<V>>,
}

#[async_trait]
impl<V> MigrationSession<V, DirectoryContext> for DirectorySession<V>
where
    V: Version + Serialize + DeserializeOwned,
{
    fn context(&mut self) -> &mut DirectoryContext {
        &mut self.context
    }

    async fn store_info(&mut self, info: MigrationInfo<V>) -> anyhow::Result<()> {
        self.staged.push(info);
        Ok(())
    }

    async fn commit(&mut self) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;

        let mut journal = read_journal::<V>(&self.journal_path)
            .await?
            .unwrap_or_default();
        for info in self.staged.drain(..) {
            journal.record(info);
        }
        write_journal(&self.journal_path, &journal).await?;

        debug!(path = %self.journal_path.display(), "Journal written");
        Ok(())
    }
}

#[async_trait]
impl<V> SessionFactory<V, DirectoryContext> for DirectoryTarget<V>
where
    V: Version + Serialize + DeserializeOwned,
{
    async fn open_latest_info_session(&self) -> anyhow::Result<Box<dyn LatestInfoSession<V>>> {
        let journal = self.read_journal().await?;
        Ok(Box::new(JournalReadSession { journal }))
    }

    async fn open_all_infos_session(&self) -> anyhow::Result<Box<dyn AllInfosSession<V>>> {
        let journal = self.read_journal().await?;
        Ok(Box::new(JournalReadSession { journal }))
    }

    async fn open_migration_session(
        &self,
        migration: &dyn Migration<DirectoryContext>,
    ) -> anyhow::Result<Box<dyn MigrationSession<V, DirectoryContext>>> {
        self.ensure_root()?;

        if migration.requires_transaction() {
            debug!(
                migration = %migration.name(),
                "Directory targets are not transactional; applying without a transaction"
            );
        }

        Ok(Box::new(DirectorySession {
            context: DirectoryContext {
                root: self.root.clone(),
            },
            journal_path: self.journal_path(),
            lock: Arc::clone(&self.lock),
            staged: Vec::new(),
        }))
    }
}
