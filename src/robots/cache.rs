//! Robots.txt caching implementation
//!
//! One entry per root domain. Concurrent first lookups for the same root
//! domain share a single fetch, and entries expire after 24 hours.

use crate::crawler::Fetcher;
use crate::robots::{fetch_robots, ParsedRobots, ROBOTS_AGENT};
use crate::url::CanonicalUrl;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

/// Cached robots.txt data for a domain
///
/// This structure stores parsed robots.txt content along with the timestamp
/// when it was fetched, allowing for cache expiration checks.
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// The parsed robots.txt content
    pub content: ParsedRobots,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    /// Creates a new CachedRobots instance stamped with the current time
    pub fn new(content: ParsedRobots) -> Self {
        Self {
            content,
            fetched_at: Utc::now(),
        }
    }

    /// Checks if the cached robots.txt is older than 24 hours
    pub fn is_stale(&self) -> bool {
        self.age() > Duration::hours(24)
    }

    /// Returns how long ago the robots.txt was fetched
    pub fn age(&self) -> Duration {
        Utc::now() - self.fetched_at
    }

    /// Checks a URL's path and query against the crawler's wildcard agent
    pub fn allows(&self, url: &CanonicalUrl) -> bool {
        self.content.is_allowed(&url.robots_path(), ROBOTS_AGENT)
    }

    /// Crawl-delay declared for the wildcard agent
    pub fn crawl_delay(&self) -> Option<std::time::Duration> {
        self.content.crawl_delay(ROBOTS_AGENT)
    }
}

type RobotsCell = Arc<OnceCell<Arc<CachedRobots>>>;

/// Per-root-domain robots.txt cache with single-flight fetching
#[derive(Debug, Default)]
pub struct RobotsCache {
    entries: Mutex<HashMap<String, RobotsCell>>,
    fetches: AtomicU64,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the robots policy governing `url`'s root domain
    ///
    /// The first caller for a root domain fetches `/robots.txt` from that
    /// URL's origin; callers arriving while the fetch is running wait for it
    /// and share its result. A stale entry is replaced and fetched again.
    /// Never fails: an unavailable robots.txt yields an allow-all policy.
    pub async fn policy_for<F: Fetcher>(
        &self,
        url: &CanonicalUrl,
        fetcher: &F,
    ) -> Arc<CachedRobots> {
        let root = url.root_domain();
        let cell = self.cell_for(&root);

        let cached = cell
            .get_or_init(|| async {
                self.fetches.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Fetching robots.txt for {} via {}", root, url.host());
                Arc::new(CachedRobots::new(fetch_robots(url, fetcher).await))
            })
            .await;

        Arc::clone(cached)
    }

    /// Returns the cached policy for a root domain without fetching
    pub fn peek(&self, root_domain: &str) -> Option<Arc<CachedRobots>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(root_domain).and_then(|cell| cell.get().cloned())
    }

    /// Number of robots.txt fetches started so far
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Number of root domains with an entry
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cell_for(&self, root: &str) -> RobotsCell {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(cell) = entries.get(root) {
            let stale = cell.get().is_some_and(|cached| cached.is_stale());
            if !stale {
                return Arc::clone(cell);
            }
            tracing::debug!("robots.txt for {} is stale, refetching", root);
        }

        let cell: RobotsCell = Arc::new(OnceCell::new());
        entries.insert(root.to_string(), Arc::clone(&cell));
        cell
    }

    #[cfg(test)]
    fn insert(&self, root: &str, cached: CachedRobots) {
        let cell: RobotsCell = Arc::new(OnceCell::new_with(Some(Arc::new(cached))));
        self.entries
            .lock()
            .unwrap()
            .insert(root.to_string(), cell);
    }
}
