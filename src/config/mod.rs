use crate::migration::MigrationApproach;
use crate::utils::DEFAULT_JOURNAL_FILE;
use crate::version::MAX_FIELDS;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tokio::fs;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid field count {0} (expected 1 to {})", MAX_FIELDS)]
    InvalidFieldCount(usize),

    #[error("Journal file name must not be empty")]
    EmptyJournalFile,
}

/// Version type a target's journal is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionFormat {
    #[default]
    Dotted,
    Timestamp,
}

impl fmt::Display for VersionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionFormat::Dotted => write!(f, "dotted"),
            VersionFormat::Timestamp => write!(f, "timestamp"),
        }
    }
}

impl FromStr for VersionFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dotted" => Ok(VersionFormat::Dotted),
            "timestamp" => Ok(VersionFormat::Timestamp),
            other => Err(format!(
                "Unknown version format '{}', expected 'dotted' or 'timestamp'",
                other
            )),
        }
    }
}

/// Default number of fields shown for dotted versions (major.minor.build)
fn default_field_count() -> usize {
    3
}

fn default_journal_file() -> String {
    DEFAULT_JOURNAL_FILE.to_string()
}

/// Migrator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigratorConfig {
    #[serde(default)]
    pub approach: MigrationApproach,
    /// Journal file name, relative to the target directory.
    #[serde(default = "default_journal_file")]
    pub journal_file: String,
    #[serde(default)]
    pub version_format: VersionFormat,
    /// Number of fields dotted versions are displayed with (1-4).
    #[serde(default = "default_field_count")]
    pub field_count: usize,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            approach: MigrationApproach::default(),
            journal_file: default_journal_file(),
            version_format: VersionFormat::default(),
            field_count: default_field_count(),
        }
    }
}

impl MigratorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.field_count == 0 || self.field_count > MAX_FIELDS {
            return Err(ConfigError::InvalidFieldCount(self.field_count));
        }
        if self.journal_file.trim().is_empty() {
            return Err(ConfigError::EmptyJournalFile);
        }
        Ok(())
    }
}

/// Read the configuration file
pub async fn read_config(config_path: &Path) -> Result<Option<MigratorConfig>, ConfigError> {
    if !config_path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(config_path).await?;
    let config: MigratorConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(Some(config))
}

/// Write the configuration file
pub async fn write_config(config_path: &Path, config: &MigratorConfig) -> Result<(), ConfigError> {
    config.validate()?;
    let content = serde_json::to_string_pretty(config)?;
    fs::write(config_path, content).await?;
    Ok(())
}
