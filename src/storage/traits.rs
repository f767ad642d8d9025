//! Storage traits and error types
//!
//! This module defines the trait interface for page stores and
//! associated error types.

use crate::storage::{PageRecord, WriteOutcome};
use crate::url::CanonicalUrl;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Record has no parent directory: {0}")]
    InvalidPath(PathBuf),
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for page store implementations
///
/// A store maps each canonical URL to exactly one location and writes each
/// location at most once. Implementations must be safe to share between
/// workers.
pub trait PageStore: Send + Sync {
    /// Computes where the record for `url` lives
    fn path_for(&self, url: &CanonicalUrl) -> PathBuf;

    /// Whether a record already exists at `path`
    fn exists(&self, path: &Path) -> bool;

    /// Creates `dir` and its parents if missing
    ///
    /// Idempotent and safe to call concurrently for the same directory.
    fn ensure_dirs(&self, dir: &Path) -> StorageResult<()>;

    /// Writes a record unless one already exists at its path
    ///
    /// # Returns
    ///
    /// * `Ok(WriteOutcome::Written)` - This call created the record
    /// * `Ok(WriteOutcome::AlreadyExists)` - Another run or worker got there first
    /// * `Err(StorageError)` - The filesystem refused
    fn write_record(&self, record: &PageRecord) -> StorageResult<WriteOutcome>;
}
