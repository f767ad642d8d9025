//! Configuration module for the TLD crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and collecting seed URLs from the inline list and the seed list file.
//!
//! # Example
//!
//! ```no_run
//! use tld_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Crawler will use {} workers", config.crawler.max_workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, OutputConfig, SeedConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{
    collect_seeds, compute_config_hash, load_config, load_config_with_hash, parse_seed_list,
};
