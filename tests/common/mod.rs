#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use migration_orchestrator::migration::{Candidate, Migration, MigrationInfo, DEFAULT_FAMILY};
use migration_orchestrator::session::{
    AllInfosSession, LatestInfoSession, MigrationSession, SessionFactory,
};
use migration_orchestrator::target::MemoryTarget;
use migration_orchestrator::version::DottedVersion;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Create a temporary directory for testing
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Fixed clock for applied-at stamps
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 9, 6, 16, 45, 0).unwrap()
}

pub fn dotted(version: &str) -> DottedVersion {
    DottedVersion::parse(version).expect("valid version")
}

pub fn dotted_info(version: &str, name: &str) -> MigrationInfo<DottedVersion> {
    MigrationInfo::new(dotted(version), name, fixed_now())
}

/// Shared, ordered record of what units and sessions did.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn contains(&self, event: &str) -> bool {
        self.events().iter().any(|e| e == event)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Succeed,
    Fail,
    /// Sleep far longer than any test runs.
    Hang,
}

/// Unit that appends its name to the context and logs its lifecycle.
pub struct Step {
    name: String,
    log: EventLog,
    behaviour: Behaviour,
    transactional: bool,
}

#[async_trait]
impl Migration<Vec<String>> for Step {
    fn name(&self) -> &str {
        &self.name
    }

    fn requires_transaction(&self) -> bool {
        self.transactional
    }

    async fn apply(&self, context: &mut Vec<String>) -> anyhow::Result<()> {
        self.log.push(format!("apply:{}", self.name));
        context.push(self.name.clone());
        match self.behaviour {
            Behaviour::Succeed => Ok(()),
            Behaviour::Fail => anyhow::bail!("{} exploded", self.name),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(600)).await;
                Ok(())
            }
        }
    }

    async fn release(&mut self) -> anyhow::Result<()> {
        self.log.push(format!("release:{}", self.name));
        Ok(())
    }
}

pub fn step(name: &str, version: &str, log: &EventLog) -> Candidate<Vec<String>> {
    step_with(name, version, log, Behaviour::Succeed, true)
}

pub fn step_with(
    name: &str,
    version: &str,
    log: &EventLog,
    behaviour: Behaviour,
    transactional: bool,
) -> Candidate<Vec<String>> {
    let unit_name = name.to_string();
    let log = log.clone();
    let ctor_log = log.clone();
    Candidate::new(
        name,
        DEFAULT_FAMILY,
        Arc::new(move || {
            ctor_log.push(format!("create:{}", unit_name));
            Ok(Box::new(Step {
                name: unit_name.clone(),
                log: log.clone(),
                behaviour,
                transactional,
            }) as Box<dyn Migration<Vec<String>>>)
        }),
    )
    .with_version(version)
}

/// Memory target that logs session traffic and can be told to fail.
pub struct RecordingTarget {
    pub inner: MemoryTarget<DottedVersion, Vec<String>>,
    pub log: EventLog,
    pub fail_reads: bool,
    pub fail_commit_of: Option<String>,
    /// Opening the session of this migration never completes.
    pub hang_open_of: Option<String>,
    open: Arc<AtomicUsize>,
    max_open: Arc<AtomicUsize>,
}

impl RecordingTarget {
    pub fn new(inner: MemoryTarget<DottedVersion, Vec<String>>, log: EventLog) -> Self {
        Self {
            inner,
            log,
            fail_reads: false,
            fail_commit_of: None,
            hang_open_of: None,
            open: Arc::new(AtomicUsize::new(0)),
            max_open: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Highest number of migration sessions open at the same time.
    pub fn max_open_sessions(&self) -> usize {
        self.max_open.load(Ordering::SeqCst)
    }

    pub fn open_sessions(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

struct RecordingSession {
    inner: Box<dyn MigrationSession<DottedVersion, Vec<String>>>,
    name: String,
    log: EventLog,
    fail_commit: bool,
    open: Arc<AtomicUsize>,
}

#[async_trait]
impl MigrationSession<DottedVersion, Vec<String>> for RecordingSession {
    fn context(&mut self) -> &mut Vec<String> {
        self.inner.context()
    }

    async fn store_info(&mut self, info: MigrationInfo<DottedVersion>) -> anyhow::Result<()> {
        self.log.push(format!("store:{}", self.name));
        self.inner.store_info(info).await
    }

    async fn commit(&mut self) -> anyhow::Result<()> {
        if self.fail_commit {
            self.log.push(format!("commit-failed:{}", self.name));
            anyhow::bail!("commit rejected");
        }
        self.log.push(format!("commit:{}", self.name));
        self.inner.commit().await
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        self.log.push(format!("close:{}", self.name));
        self.open.fetch_sub(1, Ordering::SeqCst);
        self.inner.close().await
    }
}

#[async_trait]
impl SessionFactory<DottedVersion, Vec<String>> for RecordingTarget {
    async fn open_latest_info_session(
        &self,
    ) -> anyhow::Result<Box<dyn LatestInfoSession<DottedVersion>>> {
        if self.fail_reads {
            anyhow::bail!("history unavailable");
        }
        self.log.push("read:latest");
        self.inner.open_latest_info_session().await
    }

    async fn open_all_infos_session(
        &self,
    ) -> anyhow::Result<Box<dyn AllInfosSession<DottedVersion>>> {
        if self.fail_reads {
            anyhow::bail!("history unavailable");
        }
        self.log.push("read:all");
        self.inner.open_all_infos_session().await
    }

    async fn open_migration_session(
        &self,
        migration: &dyn Migration<Vec<String>>,
    ) -> anyhow::Result<Box<dyn MigrationSession<DottedVersion, Vec<String>>>> {
        let name = migration.name().to_string();
        if self.hang_open_of.as_deref() == Some(name.as_str()) {
            self.log.push(format!("opening:{}", name));
            tokio::time::sleep(Duration::from_secs(600)).await;
        }

        let now_open = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_open.fetch_max(now_open, Ordering::SeqCst);
        self.log.push(format!("open:{}", name));

        let inner = self.inner.open_migration_session(migration).await?;
        Ok(Box::new(RecordingSession {
            fail_commit: self.fail_commit_of.as_deref() == Some(name.as_str()),
            inner,
            name,
            log: self.log.clone(),
            open: Arc::clone(&self.open),
        }))
    }
}
