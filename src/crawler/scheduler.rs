//! Scheduler for dispatching frontier URLs under politeness limits
//!
//! This module handles:
//! - The crawl lifecycle (`Idle → Running → Draining → Stopped`)
//! - Per-root-domain concurrency limits and request spacing
//! - Integrating robots.txt crawl delays
//! - Retrying transient fetch failures
//!
//! Lock order is frontier, then domain states, then the robots map. None of
//! them is held across an await.

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::{FetchError, Fetcher};
use crate::crawler::frontier::{Frontier, Take};
use crate::crawler::pipeline::{PageReport, Pipeline};
use crate::robots::RobotsCache;
use crate::state::{DomainState, SchedulerState};
use crate::url::CanonicalUrl;
use crate::CrawlError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Longest a waiting worker sleeps before re-checking the frontier
const MAX_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Scheduler hands frontier URLs to workers
///
/// The scheduler coordinates:
/// - Per-domain concurrency (max in-flight requests per root domain)
/// - Per-domain rate limits (minimum time between requests)
/// - Lifecycle state shared by all workers
pub struct Scheduler {
    config: CrawlerConfig,
    frontier: Arc<Frontier>,
    robots: Arc<RobotsCache>,
    domain_states: Mutex<HashMap<String, DomainState>>,
    state: Mutex<SchedulerState>,
}

impl Scheduler {
    /// Creates a new scheduler in the `Idle` state
    pub fn new(config: CrawlerConfig, frontier: Arc<Frontier>, robots: Arc<RobotsCache>) -> Self {
        Self {
            config,
            frontier,
            robots,
            domain_states: Mutex::new(HashMap::new()),
            state: Mutex::new(SchedulerState::Idle),
        }
    }

    fn domains(&self) -> MutexGuard<'_, HashMap<String, DomainState>> {
        self.domain_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves to `next`, rejecting transitions the lifecycle does not allow
    pub fn transition(&self, next: SchedulerState) -> Result<(), CrawlError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.can_transition_to(next) {
            return Err(CrawlError::InvalidTransition {
                from: *state,
                to: next,
            });
        }
        tracing::debug!("Scheduler {} -> {}", *state, next);
        *state = next;
        if next == SchedulerState::Stopped {
            self.frontier.close();
        }
        Ok(())
    }

    /// Enters `Draining` if currently `Running`; otherwise does nothing
    pub fn begin_draining(&self) {
        if self.state() == SchedulerState::Running {
            // Lost the race to another worker or a stop
            let _ = self.transition(SchedulerState::Draining);
        }
    }

    /// Gets the next URL to fetch
    ///
    /// This method:
    /// 1. Scans the frontier for a URL whose root domain can accept a request
    /// 2. Reserves a request slot for that domain
    /// 3. If nothing is ready, waits for a frontier change or the politeness delay
    /// 4. On a drained frontier, starts draining and closes the frontier
    ///
    /// # Returns
    ///
    /// * `Some(CanonicalUrl)` - A URL that's ready to fetch; hand it back with
    ///   [`Scheduler::release`]
    /// * `None` - The crawl is over for this worker
    pub async fn next_url(&self) -> Option<CanonicalUrl> {
        loop {
            if !self.state().accepts_work() {
                return None;
            }

            let notified = self.frontier.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let now = Instant::now();
            match self.frontier.take_where(|url| self.try_reserve(url, now)) {
                Take::Ready(url) => {
                    tracing::trace!("Dispatching {}", url);
                    return Some(url);
                }
                Take::Closed => return None,
                Take::Drained => {
                    tracing::info!("Frontier drained");
                    self.begin_draining();
                    self.frontier.close();
                    return None;
                }
                Take::Blocked => {
                    let wait = self.calculate_minimum_wait_time(Instant::now());
                    tracing::trace!("No domain ready, waiting up to {:?}", wait);
                    tokio::select! {
                        _ = &mut notified => {}
                        _ = tokio::time::sleep(wait) => {}
                    }
                }
            }
        }
    }

    /// Returns a URL taken with [`Scheduler::next_url`]
    ///
    /// Frees the domain's request slot and marks the URL done.
    pub fn release(&self, url: &CanonicalUrl) {
        if let Some(state) = self.domains().get_mut(&url.root_domain()) {
            state.finish_request();
        }
        self.frontier.complete(url);
    }

    /// Tries to claim a request slot for `url`'s root domain
    ///
    /// Called under the frontier lock, so the check and the reservation
    /// cannot interleave with another worker's.
    fn try_reserve(&self, url: &CanonicalUrl, now: Instant) -> bool {
        let root = url.root_domain();
        let mut domains = self.domains();
        let state = domains.entry(root.clone()).or_insert_with(DomainState::new);

        if state.crawl_delay.is_none() {
            if let Some(robots) = self.robots.peek(&root) {
                state.crawl_delay = robots.crawl_delay();
            }
        }

        if state.can_request(&self.config, now) {
            state.record_request(now);
            true
        } else {
            false
        }
    }

    /// Calculates how long to wait before any domain may be ready
    ///
    /// Domains blocked only by concurrency become ready when a request
    /// completes, which wakes waiters through the frontier, so only spacing
    /// delays are considered here.
    fn calculate_minimum_wait_time(&self, now: Instant) -> Duration {
        let domains = self.domains();
        let min_wait = domains
            .values()
            .filter(|state| state.active_requests < self.config.max_domain_concurrency)
            .filter_map(|state| state.time_until_next_request(&self.config, now))
            .min()
            .unwrap_or(MAX_POLL_INTERVAL)
            .min(MAX_POLL_INTERVAL);

        // Small buffer so the domain is definitely ready on wake-up
        min_wait + Duration::from_millis(5)
    }

    /// Waits until `url` may be requested again after a failed attempt
    ///
    /// Sleeps at least `retry_delay`, then for as long as the domain's
    /// politeness spacing requires. The request keeps the slot it reserved
    /// in [`Scheduler::next_url`]; only the spacing clock is restarted.
    pub async fn await_retry_slot(&self, url: &CanonicalUrl, retry_delay: Duration) {
        let root = url.root_domain();
        tokio::time::sleep(retry_delay).await;

        loop {
            let wait = {
                let mut domains = self.domains();
                let state = domains.entry(root.clone()).or_insert_with(DomainState::new);
                let now = Instant::now();
                match state.time_until_next_request(&self.config, now) {
                    Some(wait) => wait,
                    None => {
                        state.record_retry(now);
                        return;
                    }
                }
            };
            tracing::trace!("Retry of {} waits {:?} for {}", url, wait, root);
            tokio::time::sleep(wait).await;
        }
    }

    /// Politeness state of a root domain, if it was ever scheduled
    pub fn domain_state(&self, root_domain: &str) -> Option<DomainState> {
        self.domains().get(root_domain).cloned()
    }
}

/// How transient failures are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            delay: config.retry_delay(),
        }
    }
}

/// Processes a URL, retrying transient fetch failures
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | Timeout, connection failure, transfer reset | Retry after `delay` |
/// | HTTP 5xx | Retry after `delay` |
/// | Body over the size cap | Give up immediately |
/// | Any other HTTP status | Give up immediately |
/// | Retries exhausted | Give up |
///
/// Each retry also waits out the domain's politeness delay through
/// [`Scheduler::await_retry_slot`]. `on_retry` is called with the attempt
/// number before each retry.
pub async fn process_with_retry<F, R>(
    scheduler: &Scheduler,
    pipeline: &Pipeline<F>,
    url: &CanonicalUrl,
    policy: RetryPolicy,
    mut on_retry: R,
) -> Result<PageReport, FetchError>
where
    F: Fetcher,
    R: FnMut(u32),
{
    let mut attempt = 0;
    loop {
        match pipeline.process(url).await {
            Ok(report) => return Ok(report),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                tracing::warn!(
                    "Fetch of {} failed ({}), retry {}/{} in {:?}",
                    url,
                    e,
                    attempt,
                    policy.max_retries,
                    policy.delay
                );
                on_retry(attempt);
                scheduler.await_retry_slot(url, policy.delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::parser::LinkScope;
    use crate::crawler::testing::{Reply, StaticFetcher};
    use crate::robots::{CachedRobots, ParsedRobots};
    use crate::storage::FsStorage;
    use crate::url::{normalize_url, IdentityPolicy};
    use tempfile::TempDir;

    fn create_test_config() -> CrawlerConfig {
        CrawlerConfig {
            max_workers: 4,
            max_domain_concurrency: 1,
            politeness_delay_ms: 200,
            max_retries: 2,
            retry_delay_ms: 1,
            request_timeout_secs: 5,
            max_body_bytes: 1024 * 1024,
            follow_relative_links: false,
            respect_crawl_delay: true,
        }
    }

    fn canonical(raw: &str) -> CanonicalUrl {
        normalize_url(raw, &IdentityPolicy::default()).unwrap()
    }

    fn scheduler(config: CrawlerConfig) -> (Scheduler, Arc<Frontier>) {
        let frontier = Arc::new(Frontier::new());
        let scheduler = Scheduler::new(config, frontier.clone(), Arc::new(RobotsCache::new()));
        (scheduler, frontier)
    }

    #[test]
    fn test_new_scheduler_idle() {
        let (scheduler, _) = scheduler(create_test_config());
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let (scheduler, _) = scheduler(create_test_config());
        let err = scheduler.transition(SchedulerState::Draining).unwrap_err();
        assert!(matches!(
            err,
            CrawlError::InvalidTransition {
                from: SchedulerState::Idle,
                to: SchedulerState::Draining
            }
        ));
    }

    #[test]
    fn test_stopped_closes_frontier() {
        let (scheduler, frontier) = scheduler(create_test_config());
        scheduler.transition(SchedulerState::Running).unwrap();
        scheduler.transition(SchedulerState::Stopped).unwrap();
        assert!(frontier.is_closed());
    }

    #[tokio::test]
    async fn test_next_url_from_frontier() {
        let (scheduler, frontier) = scheduler(create_test_config());
        frontier.admit(canonical("http://a.test/page"));
        scheduler.transition(SchedulerState::Running).unwrap();

        let url = scheduler.next_url().await.unwrap();
        assert_eq!(url.key(), "http://a.test/page");
        assert_eq!(scheduler.domain_state("a.test").unwrap().active_requests, 1);
    }

    #[tokio::test]
    async fn test_next_url_not_running() {
        let (scheduler, frontier) = scheduler(create_test_config());
        frontier.admit(canonical("http://a.test/page"));
        assert!(scheduler.next_url().await.is_none());
    }

    #[tokio::test]
    async fn test_drained_frontier_starts_draining() {
        let (scheduler, frontier) = scheduler(create_test_config());
        scheduler.transition(SchedulerState::Running).unwrap();

        assert!(scheduler.next_url().await.is_none());
        assert_eq!(scheduler.state(), SchedulerState::Draining);
        assert!(frontier.is_closed());
    }

    #[tokio::test]
    async fn test_same_domain_spaced_out() {
        let (scheduler, frontier) = scheduler(create_test_config());
        frontier.admit(canonical("http://a.test/1"));
        frontier.admit(canonical("http://www.a.test/2"));
        scheduler.transition(SchedulerState::Running).unwrap();

        let start = Instant::now();
        let first = scheduler.next_url().await.unwrap();
        scheduler.release(&first);
        let second = scheduler.next_url().await.unwrap();

        assert_eq!(second.key(), "http://www.a.test/2");
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_other_domain_not_blocked() {
        let (scheduler, frontier) = scheduler(create_test_config());
        frontier.admit(canonical("http://a.test/1"));
        frontier.admit(canonical("http://a.test/2"));
        frontier.admit(canonical("http://b.test/1"));
        scheduler.transition(SchedulerState::Running).unwrap();

        let first = scheduler.next_url().await.unwrap();
        let second = tokio::time::timeout(Duration::from_millis(100), scheduler.next_url())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first.key(), "http://a.test/1");
        assert_eq!(second.key(), "http://b.test/1");
    }

    #[tokio::test]
    async fn test_crawl_delay_picked_up_from_robots() {
        let frontier = Arc::new(Frontier::new());
        let robots = Arc::new(RobotsCache::new());
        let fetcher = StaticFetcher::new()
            .route("http://a.test/robots.txt", Reply::text("User-agent: *\nCrawl-delay: 3"));
        robots.policy_for(&canonical("http://a.test/"), &fetcher).await;

        let scheduler = Scheduler::new(create_test_config(), frontier.clone(), robots);
        frontier.admit(canonical("http://a.test/1"));
        scheduler.transition(SchedulerState::Running).unwrap();
        scheduler.next_url().await.unwrap();

        let state = scheduler.domain_state("a.test").unwrap();
        assert_eq!(state.crawl_delay, Some(Duration::from_secs(3)));
        assert_eq!(
            state.effective_delay(&create_test_config()),
            Duration::from_secs(3)
        );
    }

    #[test]
    fn test_allow_all_robots_has_no_crawl_delay() {
        let cached = CachedRobots::new(ParsedRobots::allow_all());
        assert_eq!(cached.crawl_delay(), None);
    }

    fn pipeline(fetcher: StaticFetcher, dir: &TempDir) -> Pipeline<StaticFetcher> {
        Pipeline::new(
            Arc::new(fetcher),
            Arc::new(FsStorage::new(dir.path(), false, &IdentityPolicy::default())),
            Arc::new(RobotsCache::new()),
            Arc::new(Frontier::new()),
            IdentityPolicy::default(),
            LinkScope::AbsoluteOnly,
        )
    }

    fn quick_retries() -> CrawlerConfig {
        CrawlerConfig {
            politeness_delay_ms: 0,
            ..create_test_config()
        }
    }

    #[tokio::test]
    async fn test_transient_failure_retried() {
        let dir = TempDir::new().unwrap();
        let fetcher = StaticFetcher::new()
            .route("http://a.test/", Reply::status(503))
            .route("http://a.test/", Reply::html("<p>ok</p>"));
        let pipeline = pipeline(fetcher, &dir);
        let (scheduler, _) = scheduler(quick_retries());
        let policy = RetryPolicy::from_config(&quick_retries());

        let mut retries = Vec::new();
        let url = canonical("http://a.test/");
        let report = process_with_retry(&scheduler, &pipeline, &url, policy, |n| retries.push(n))
            .await
            .unwrap();

        assert_eq!(report.status, 200);
        assert_eq!(retries, vec![1]);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let dir = TempDir::new().unwrap();
        let fetcher = StaticFetcher::new().route(
            "http://a.test/",
            Reply::Fail(FetchError::Timeout("slow".to_string())),
        );
        let pipeline = pipeline(fetcher, &dir);
        let (scheduler, _) = scheduler(quick_retries());
        let policy = RetryPolicy::from_config(&quick_retries());

        let mut retries = 0;
        let url = canonical("http://a.test/");
        let err = process_with_retry(&scheduler, &pipeline, &url, policy, |_| retries += 1)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Timeout(_)));
        assert_eq!(retries, 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let dir = TempDir::new().unwrap();
        let fetcher = StaticFetcher::new().route("http://a.test/", Reply::status(404));
        let pipeline = pipeline(fetcher, &dir);
        let (scheduler, _) = scheduler(quick_retries());
        let policy = RetryPolicy::from_config(&quick_retries());

        let mut retries = 0;
        let url = canonical("http://a.test/");
        let err = process_with_retry(&scheduler, &pipeline, &url, policy, |_| retries += 1)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status(404)));
        assert_eq!(retries, 0);
    }

    #[tokio::test]
    async fn test_retry_respects_politeness_delay() {
        let dir = TempDir::new().unwrap();
        let fetcher = StaticFetcher::new()
            .route("http://a.test/", Reply::status(503))
            .route("http://a.test/", Reply::html("<p>ok</p>"));
        let pipeline = pipeline(fetcher, &dir);
        let (scheduler, frontier) = scheduler(create_test_config());
        let policy = RetryPolicy::from_config(&create_test_config());
        frontier.admit(canonical("http://a.test/"));
        scheduler.transition(SchedulerState::Running).unwrap();

        let start = Instant::now();
        let url = scheduler.next_url().await.unwrap();
        let report = process_with_retry(&scheduler, &pipeline, &url, policy, |_| {})
            .await
            .unwrap();

        assert_eq!(report.status, 200);
        assert!(start.elapsed() >= Duration::from_millis(200));
        let state = scheduler.domain_state("a.test").unwrap();
        assert_eq!(state.request_count, 2);
        assert_eq!(state.active_requests, 1);
    }
}
