use crate::config::CrawlerConfig;
use std::time::{Duration, Instant};

/// Tracks the politeness state of one root domain during crawling
///
/// This structure maintains the per-domain information needed to bound
/// concurrency and space out requests.
#[derive(Debug, Clone, Default)]
pub struct DomainState {
    /// Requests to this domain currently in flight
    pub active_requests: u32,

    /// Number of requests made to this domain in the current crawl
    pub request_count: u64,

    /// Timestamp of the last request to this domain
    pub last_request_time: Option<Instant>,

    /// Crawl-delay taken from the domain's robots.txt
    pub crawl_delay: Option<Duration>,
}

impl DomainState {
    /// Creates a new DomainState with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimum spacing between requests to this domain
    ///
    /// The configured politeness delay, raised by robots.txt Crawl-delay when
    /// the crawler is set to respect it.
    pub fn effective_delay(&self, config: &CrawlerConfig) -> Duration {
        let base = config.politeness_delay();
        match self.crawl_delay {
            Some(delay) if config.respect_crawl_delay => base.max(delay),
            _ => base,
        }
    }

    /// Checks if a request can be made to this domain
    ///
    /// This method enforces:
    /// - Maximum concurrent requests per domain
    /// - Minimum time between requests to the same domain
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration containing limits
    /// * `now` - The current time instant
    ///
    /// # Returns
    ///
    /// * `true` - If a request can be made now
    /// * `false` - If the request should be delayed
    pub fn can_request(&self, config: &CrawlerConfig, now: Instant) -> bool {
        if self.active_requests >= config.max_domain_concurrency {
            return false;
        }

        self.time_until_next_request(config, now).is_none()
    }

    /// Records that a request to this domain started
    pub fn record_request(&mut self, now: Instant) {
        self.active_requests += 1;
        self.request_count += 1;
        self.last_request_time = Some(now);
    }

    /// Records a retry of a request that already holds a slot
    pub fn record_retry(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(now);
    }

    /// Records that a request to this domain finished
    pub fn finish_request(&mut self) {
        self.active_requests = self.active_requests.saturating_sub(1);
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if the delay has elapsed, or the duration to wait otherwise.
    /// Concurrency is not considered here.
    pub fn time_until_next_request(
        &self,
        config: &CrawlerConfig,
        now: Instant,
    ) -> Option<Duration> {
        let last = self.last_request_time?;
        let min_delay = self.effective_delay(config);
        let elapsed = now.saturating_duration_since(last);
        if elapsed < min_delay {
            Some(min_delay - elapsed)
        } else {
            None
        }
    }
}
