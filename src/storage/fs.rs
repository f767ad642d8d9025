//! Filesystem page store
//!
//! Records live at `<root>/<tld>/<root-domain>/<file>.txt`, one file per
//! canonical URL. The file name is the host and path with characters that
//! are unsafe in file names replaced by `_`.

use crate::storage::traits::{PageStore, StorageError, StorageResult};
use crate::storage::{PageRecord, WriteOutcome};
use crate::url::{CanonicalUrl, IdentityPolicy};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Characters replaced by `_` in directory and file names
const UNSAFE_CHARS: &[char] = &['/', '?', '*', '|', '<', '>', '"', ':', '\\'];

/// Longest file stem kept before the `.txt` suffix (bytes)
const MAX_STEM_BYTES: usize = 200;

const RECORD_SUFFIX: &str = ".txt";

/// Replaces unsafe and control characters with `_`
///
/// Distinct URLs can collapse to one name (`/a?b` and `/a_b`); the first
/// record written wins.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if UNSAFE_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Cuts `name` to at most `max` bytes on a character boundary
fn truncate_bytes(name: &str, max: usize) -> &str {
    if name.len() <= max {
        return name;
    }
    let mut end = max;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

/// Page store writing one file per URL under a `domains/` tree
#[derive(Debug)]
pub struct FsStorage {
    root: PathBuf,
    persist_body: bool,
    keep_port: bool,
    known_dirs: Mutex<HashSet<PathBuf>>,
    dirs_created: AtomicU64,
}

impl FsStorage {
    /// Creates a store rooted at `root`
    ///
    /// # Arguments
    ///
    /// * `root` - The `domains/` directory
    /// * `persist_body` - Write decoded text instead of empty markers
    /// * `identity` - Whether an explicit port becomes part of file names
    pub fn new(root: impl Into<PathBuf>, persist_body: bool, identity: &IdentityPolicy) -> Self {
        Self {
            root: root.into(),
            persist_body,
            keep_port: identity.keep_port,
            known_dirs: Mutex::new(HashSet::new()),
            dirs_created: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every record of one root domain
    pub fn domain_dir(&self, tld: &str, root_domain: &str) -> PathBuf {
        self.root
            .join(sanitize_file_name(tld))
            .join(sanitize_file_name(root_domain))
    }

    /// File name for a URL: host, optional port, path and optional query
    pub fn file_name_for(&self, url: &CanonicalUrl) -> String {
        let mut name = url.host().to_string();
        if self.keep_port {
            if let Some(port) = url.port() {
                name.push_str(&format!(":{}", port));
            }
        }
        name.push_str(url.path());
        if let Some(query) = url.query() {
            name.push('?');
            name.push_str(query);
        }

        let sanitized = sanitize_file_name(&name);
        format!("{}{}", truncate_bytes(&sanitized, MAX_STEM_BYTES), RECORD_SUFFIX)
    }

    /// Pre-creates one directory per TLD from the reference table
    ///
    /// # Returns
    ///
    /// The number of TLD directories that now exist
    pub fn prepare_tld_directories(&self, tlds: &[String]) -> StorageResult<usize> {
        for tld in tlds {
            self.ensure_dirs(&self.root.join(sanitize_file_name(tld)))?;
        }
        tracing::info!(
            "Prepared {} TLD directories under {}",
            tlds.len(),
            self.root.display()
        );
        Ok(tlds.len())
    }

    /// Directories this process actually created
    pub fn directories_created(&self) -> u64 {
        self.dirs_created.load(Ordering::Relaxed)
    }
}

impl PageStore for FsStorage {
    fn path_for(&self, url: &CanonicalUrl) -> PathBuf {
        self.domain_dir(&url.tld(), &url.root_domain())
            .join(self.file_name_for(url))
    }

    fn exists(&self, path: &Path) -> bool {
        path.try_exists().unwrap_or(false)
    }

    fn ensure_dirs(&self, dir: &Path) -> StorageResult<()> {
        {
            let known = self.known_dirs.lock().unwrap_or_else(PoisonError::into_inner);
            if known.contains(dir) {
                return Ok(());
            }
        }

        let existed = dir.is_dir();
        std::fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
        if !existed {
            self.dirs_created.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Created directory {}", dir.display());
        }

        self.known_dirs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(dir.to_path_buf());
        Ok(())
    }

    fn write_record(&self, record: &PageRecord) -> StorageResult<WriteOutcome> {
        let parent = record
            .storage_path
            .parent()
            .ok_or_else(|| StorageError::InvalidPath(record.storage_path.clone()))?;
        self.ensure_dirs(parent)?;

        let file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&record.storage_path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Ok(WriteOutcome::AlreadyExists);
            }
            Err(e) => return Err(StorageError::io(&record.storage_path, e)),
        };

        if self.persist_body {
            fill_record(&record.storage_path, file, &record.text)?;
        }

        Ok(WriteOutcome::Written)
    }
}

/// Writes `text` into a freshly created record
///
/// A partial record would count as stored on every later run, so the file
/// at `path` is removed when the write fails.
fn fill_record<W: Write>(path: &Path, mut out: W, text: &str) -> StorageResult<()> {
    if let Err(e) = out.write_all(text.as_bytes()).and_then(|()| out.flush()) {
        drop(out);
        if let Err(remove_err) = std::fs::remove_file(path) {
            tracing::warn!("Failed to remove partial record {}: {}", path.display(), remove_err);
        }
        return Err(StorageError::io(path, e));
    }
    Ok(())
}
