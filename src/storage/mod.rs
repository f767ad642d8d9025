//! Storage module for persisting crawl data
//!
//! This module handles the on-disk record tree, including:
//! - Mapping canonical URLs to `<tld>/<root-domain>/<file>` paths
//! - Write-once record files (existence is the dedup marker)
//! - Pre-creating TLD directories from the reference table

mod fs;
mod tld_table;
mod traits;

pub use fs::{sanitize_file_name, FsStorage};
pub use tld_table::{load_tld_table, parse_tld_table};
pub use traits::{PageStore, StorageError, StorageResult};

use crate::url::CanonicalUrl;
use std::path::PathBuf;

/// One stored page
#[derive(Debug, Clone)]
pub struct PageRecord {
    /// Identity key of the page
    pub url: String,
    pub tld: String,
    pub root_domain: String,
    pub storage_path: PathBuf,
    /// Decoded page text; only written when bodies are persisted
    pub text: String,
    /// Name of the encoding used to decode the body
    pub encoding: String,
}

impl PageRecord {
    pub fn new(url: &CanonicalUrl, storage_path: PathBuf, text: String, encoding: &str) -> Self {
        let root_domain = url.root_domain();
        Self {
            url: url.key().to_string(),
            tld: crate::url::tld(&root_domain),
            root_domain,
            storage_path,
            text,
            encoding: encoding.to_string(),
        }
    }
}

/// Result of a write attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    AlreadyExists,
}
