//! Crawl statistics
//!
//! This module provides live counters shared by the workers, a snapshot type
//! for the end-of-run report, and a summary of an existing `domains/` tree.

use crate::CrawlError;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Live counters updated by workers
#[derive(Debug, Default)]
pub struct CrawlStats {
    pages_processed: AtomicU64,
    pages_written: AtomicU64,
    already_stored: AtomicU64,
    storage_failures: AtomicU64,
    robots_disallowed_pages: AtomicU64,
    links_found: AtomicU64,
    links_admitted: AtomicU64,
    robots_blocked: AtomicU64,
    fetch_failures: AtomicU64,
    retries: AtomicU64,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a page that was fetched and handled; returns the new total
    pub fn record_processed(&self) -> u64 {
        self.pages_processed.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_written(&self) {
        self.pages_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_already_stored(&self) {
        self.already_stored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_storage_failure(&self) {
        self.storage_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_robots_disallowed_page(&self) {
        self.robots_disallowed_pages.fetch_add(1, Ordering::Relaxed);
    }

    /// Records the outcome of one page's link discovery
    pub fn record_links(&self, found: u64, admitted: u64, blocked: u64) {
        self.links_found.fetch_add(found, Ordering::Relaxed);
        self.links_admitted.fetch_add(admitted, Ordering::Relaxed);
        self.robots_blocked.fetch_add(blocked, Ordering::Relaxed);
    }

    pub fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn pages_processed(&self) -> u64 {
        self.pages_processed.load(Ordering::Relaxed)
    }

    /// Copies the counters into a report
    ///
    /// # Arguments
    ///
    /// * `seen_urls` - Distinct URLs ever admitted to the frontier
    /// * `directories_created` - Directories the store created
    /// * `robots_fetches` - robots.txt fetches started
    /// * `elapsed` - Wall time of the run
    pub fn snapshot(
        &self,
        seen_urls: u64,
        directories_created: u64,
        robots_fetches: u64,
        elapsed: Duration,
    ) -> CrawlStatistics {
        CrawlStatistics {
            pages_processed: self.pages_processed.load(Ordering::Relaxed),
            pages_written: self.pages_written.load(Ordering::Relaxed),
            already_stored: self.already_stored.load(Ordering::Relaxed),
            storage_failures: self.storage_failures.load(Ordering::Relaxed),
            robots_disallowed_pages: self.robots_disallowed_pages.load(Ordering::Relaxed),
            links_found: self.links_found.load(Ordering::Relaxed),
            links_admitted: self.links_admitted.load(Ordering::Relaxed),
            robots_blocked: self.robots_blocked.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            seen_urls,
            directories_created,
            robots_fetches,
            elapsed,
        }
    }
}

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlStatistics {
    /// Pages fetched successfully and handled
    pub pages_processed: u64,

    /// New records written
    pub pages_written: u64,

    /// Pages whose record already existed
    pub already_stored: u64,

    /// Record writes refused by the filesystem
    pub storage_failures: u64,

    /// Pages whose own URL robots.txt disallowed (links not followed)
    pub robots_disallowed_pages: u64,

    /// Candidate links extracted
    pub links_found: u64,

    /// Links admitted to the frontier
    pub links_admitted: u64,

    /// Links rejected by the target's robots.txt
    pub robots_blocked: u64,

    /// URLs dropped after a permanent error or exhausted retries
    pub fetch_failures: u64,

    /// Retry attempts after transient errors
    pub retries: u64,

    /// Distinct URLs admitted over the whole run
    pub seen_urls: u64,

    /// Directories created under the output root
    pub directories_created: u64,

    /// robots.txt fetches
    pub robots_fetches: u64,

    /// Wall time of the run
    pub elapsed: Duration,
}

impl CrawlStatistics {
    pub fn pages_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.pages_processed as f64 / secs
        } else {
            0.0
        }
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  URLs seen: {}", stats.seen_urls);
    println!("  Pages processed: {}", stats.pages_processed);
    println!(
        "  Elapsed: {:.1}s ({:.2} pages/sec)",
        stats.elapsed.as_secs_f64(),
        stats.pages_per_second()
    );
    println!();

    println!("Storage:");
    println!("  Records written: {}", stats.pages_written);
    println!("  Already stored: {}", stats.already_stored);
    println!("  Write failures: {}", stats.storage_failures);
    println!("  Directories created: {}", stats.directories_created);
    println!();

    println!("Links:");
    println!("  Found: {}", stats.links_found);
    println!("  Admitted: {}", stats.links_admitted);
    println!("  Blocked by robots.txt: {}", stats.robots_blocked);
    println!("  Pages not followed (robots.txt): {}", stats.robots_disallowed_pages);
    println!("  robots.txt fetches: {}", stats.robots_fetches);
    println!();

    println!("Failures:");
    println!("  Dropped URLs: {}", stats.fetch_failures);
    println!("  Retries: {}", stats.retries);
}

/// Summary of an existing `domains/` tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeStatistics {
    /// TLD directories present
    pub tld_dirs: u64,

    /// Root-domain directories present
    pub root_domains: u64,

    /// Record files present
    pub records: u64,

    /// Record count per TLD (TLDs without records omitted)
    pub records_by_tld: BTreeMap<String, u64>,
}

/// Loads statistics from an existing `domains/` tree
///
/// # Arguments
///
/// * `domains_root` - The output root holding `<tld>/<root-domain>/` directories
///
/// # Returns
///
/// * `Ok(TreeStatistics)` - Successfully walked the tree
/// * `Err(CrawlError)` - The tree could not be read
pub fn load_statistics(domains_root: &Path) -> Result<TreeStatistics, CrawlError> {
    let mut stats = TreeStatistics::default();

    for tld_entry in std::fs::read_dir(domains_root)? {
        let tld_entry = tld_entry?;
        if !tld_entry.file_type()?.is_dir() {
            continue;
        }
        stats.tld_dirs += 1;

        let mut tld_records = 0;
        for domain_entry in std::fs::read_dir(tld_entry.path())? {
            let domain_entry = domain_entry?;
            if !domain_entry.file_type()?.is_dir() {
                continue;
            }
            stats.root_domains += 1;

            for record in std::fs::read_dir(domain_entry.path())? {
                if record?.file_type()?.is_file() {
                    tld_records += 1;
                }
            }
        }

        if tld_records > 0 {
            stats.records += tld_records;
            stats
                .records_by_tld
                .insert(tld_entry.file_name().to_string_lossy().into_owned(), tld_records);
        }
    }

    Ok(stats)
}

/// Prints a `domains/` tree summary to stdout
pub fn print_tree_statistics(stats: &TreeStatistics) {
    println!("=== Stored Pages ===\n");

    println!("Overview:");
    println!("  TLD directories: {}", stats.tld_dirs);
    println!("  Root domains: {}", stats.root_domains);
    println!("  Records: {}", stats.records);
    println!();

    if !stats.records_by_tld.is_empty() {
        println!("Records by TLD:");
        let mut counts: Vec<_> = stats.records_by_tld.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (tld, count) in counts {
            let percentage = (*count as f64 / stats.records as f64) * 100.0;
            println!("  {}: {} ({:.1}%)", tld, count, percentage);
        }
    }
}
