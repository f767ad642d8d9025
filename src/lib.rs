//! tld-crawler: a polite, domain-partitioned web crawler
//!
//! This crate crawls the web from a seed set, follows outbound links, honors
//! robots.txt per registrable domain and records one marker file per distinct
//! page under `domains/<tld>/<root-domain>/`.

pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid scheduler transition: {from} -> {to}")]
    InvalidTransition {
        from: state::SchedulerState,
        to: state::SchedulerState,
    },

    #[error("Worker task failed: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
///
/// These are the only errors allowed to abort a whole run, and they are
/// raised before any network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("TLD reference table {path} could not be read: {source}")]
    TldTable {
        path: String,
        source: std::io::Error,
    },

    #[error("Seed file {path} could not be read: {source}")]
    SeedFile {
        path: String,
        source: std::io::Error,
    },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, StopHandle};
pub use state::SchedulerState;
pub use url::{normalize_url, root_domain, tld, CanonicalUrl, IdentityPolicy};
