//! Target systems the engine can migrate.
//!
//! [`MemoryTarget`] keeps its state in process and is what embedders and
//! tests reach for. [`DirectoryTarget`] migrates a directory on disk and
//! keeps its history in a JSON journal next to the data.

mod directory;
mod journal;
mod memory;

pub use directory::{DirectoryContext, DirectoryTarget};
pub use journal::{read_journal, write_journal, Journal};
pub use memory::MemoryTarget;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TargetError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Target directory not found: {0}")]
    NotADirectory(String),
}
