use super::TargetError;
use crate::migration::{ConfigurationError, MigrationInfo};
use crate::utils::{now_utc, JOURNAL_SCHEMA_VERSION};
use crate::version::Version;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;

/// Applied-migration history persisted by a directory target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Journal<V> {
    pub schema_version: u32,
    pub updated_at: DateTime<Utc>,
    #[serde(default = "Vec::new")]
    pub migrations: Vec<MigrationInfo<V>>,
}

impl<V> Journal<V> {
    pub fn new() -> Self {
        Self {
            schema_version: JOURNAL_SCHEMA_VERSION,
            updated_at: now_utc(),
            migrations: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

impl<V> Default for Journal<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Version> Journal<V> {
    /// Record with the highest version.
    pub fn latest(&self) -> Option<&MigrationInfo<V>> {
        self.migrations.iter().max_by(|a, b| a.version.cmp(&b.version))
    }

    /// Versions recorded more than once, with the names of every record
    /// carrying them.
    pub fn duplicate_versions(&self) -> BTreeMap<V, Vec<String>> {
        let mut by_version: BTreeMap<V, Vec<String>> = BTreeMap::new();
        for info in &self.migrations {
            by_version
                .entry(info.version.clone())
                .or_default()
                .push(info.name.clone());
        }
        by_version.retain(|_, names| names.len() > 1);
        by_version
    }

    /// Fail on the first version recorded twice.
    pub fn validate_unique_versions(&self) -> Result<(), ConfigurationError> {
        match self.duplicate_versions().into_iter().next() {
            Some((version, names)) => Err(ConfigurationError::DuplicateAppliedVersion {
                version: version.to_string(),
                first: names[0].clone(),
                second: names[1].clone(),
            }),
            None => Ok(()),
        }
    }

    /// Append a record and bump `updated_at`.
    pub fn record(&mut self, info: MigrationInfo<V>) {
        self.migrations.push(info);
        self.updated_at = now_utc();
    }
}

/// Read a journal file. A missing file is `None`.
pub async fn read_journal<V>(path: &Path) -> Result<Option<Journal<V>>, TargetError>
where
    V: DeserializeOwned,
{
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).await?;
    let journal: Journal<V> = serde_json::from_str(&content)?;
    Ok(Some(journal))
}

/// Write a journal file atomically.
pub async fn write_journal<V>(path: &Path, journal: &Journal<V>) -> Result<(), TargetError>
where
    V: Serialize,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    // Write atomically using temp file + rename
    let temp_path = path.with_extension("json.tmp");
    let content = serde_json::to_string_pretty(journal)?;
    fs::write(&temp_path, &content).await?;
    fs::rename(&temp_path, path).await?;

    Ok(())
}
