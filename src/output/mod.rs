//! Output module for crawl statistics and reports
//!
//! This module handles:
//! - Live counters shared by workers
//! - The end-of-run statistics table
//! - Summaries of an existing `domains/` tree

pub mod stats;

pub use stats::{
    load_statistics, print_statistics, print_tree_statistics, CrawlStatistics, CrawlStats,
    TreeStatistics,
};
