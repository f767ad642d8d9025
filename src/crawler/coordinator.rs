//! Crawler coordinator - main crawl orchestration logic
//!
//! The coordinator owns every piece of shared crawl state and wires them
//! together:
//! - Loading the TLD table and seeds before any network activity
//! - Spawning the worker pool and joining it
//! - Recording statistics from page reports
//! - Reacting to the stop signal

use crate::config::{collect_seeds, Config};
use crate::crawler::fetcher::{FetchError, Fetcher, HttpFetcher};
use crate::crawler::frontier::Frontier;
use crate::crawler::parser::LinkScope;
use crate::crawler::pipeline::{Discovery, PageReport, Pipeline, SkipReason, StorageOutcome};
use crate::crawler::scheduler::{process_with_retry, RetryPolicy, Scheduler};
use crate::output::{CrawlStatistics, CrawlStats};
use crate::robots::RobotsCache;
use crate::state::SchedulerState;
use crate::storage::{load_tld_table, FsStorage, PageStore};
use crate::url::{normalize_url, CanonicalUrl};
use crate::CrawlError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinSet;

/// Pages between progress log lines
const PROGRESS_INTERVAL: u64 = 10;

/// Requests a running crawl to stop
///
/// Cloneable; every clone controls the same crawl.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Signals every worker to abandon its work and exit
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Resolves once a stop was requested
async fn stop_requested(rx: &mut watch::Receiver<bool>) {
    // A dropped sender also ends the wait
    let _ = rx.wait_for(|stopped| *stopped).await;
}

/// State shared by all workers
struct Shared<F: Fetcher> {
    frontier: Arc<Frontier>,
    scheduler: Scheduler,
    pipeline: Pipeline<F>,
    stats: CrawlStats,
    retry: RetryPolicy,
}

impl<F: Fetcher> Shared<F> {
    fn record(&self, url: &CanonicalUrl, result: Result<PageReport, FetchError>) {
        let report = match result {
            Ok(report) => report,
            Err(e) => {
                self.stats.record_fetch_failure();
                tracing::warn!("Dropping {}: {}", url, e);
                return;
            }
        };

        let processed = self.stats.record_processed();

        match &report.storage {
            StorageOutcome::Written(path) => {
                self.stats.record_written();
                tracing::debug!("Stored {} at {}", url, path.display());
            }
            StorageOutcome::Skipped(SkipReason::AlreadyStored) => {
                self.stats.record_already_stored()
            }
            StorageOutcome::Skipped(_) => {}
            StorageOutcome::Failed(_) => self.stats.record_storage_failure(),
        }

        match report.discovery {
            Discovery::Followed {
                found,
                admitted,
                blocked,
            } => self.stats.record_links(found, admitted, blocked),
            Discovery::Skipped(SkipReason::RobotsDisallowed) => {
                self.stats.record_robots_disallowed_page()
            }
            Discovery::Skipped(_) => {}
        }

        tracing::debug!(
            "Processed {} ({}, {}, title: {:?})",
            url,
            report.status,
            report.encoding,
            report.title
        );

        if processed % PROGRESS_INTERVAL == 0 {
            tracing::info!(
                "Progress: {} pages processed, {} pending, {} in flight, {} URLs seen",
                processed,
                self.frontier.pending_len(),
                self.frontier.in_flight(),
                self.frontier.seen_len()
            );
        }
    }
}

/// One worker: take a URL, process it, hand it back, repeat
async fn worker_loop<F: Fetcher>(
    id: u32,
    shared: Arc<Shared<F>>,
    mut stop: watch::Receiver<bool>,
) {
    tracing::debug!("Worker {} started", id);

    loop {
        let url = tokio::select! {
            biased;
            _ = stop_requested(&mut stop) => break,
            next = shared.scheduler.next_url() => match next {
                Some(url) => url,
                None => break,
            },
        };

        let result = tokio::select! {
            biased;
            _ = stop_requested(&mut stop) => None,
            result = process_with_retry(
                &shared.scheduler,
                &shared.pipeline,
                &url,
                shared.retry,
                |_| shared.stats.record_retry(),
            ) => Some(result),
        };

        shared.scheduler.release(&url);

        match result {
            Some(result) => shared.record(&url, result),
            None => {
                tracing::debug!("Worker {} abandoned {}", id, url);
                break;
            }
        }
    }

    tracing::debug!("Worker {} finished", id);
}

/// Main crawler coordinator structure
pub struct Coordinator<F: Fetcher = HttpFetcher> {
    shared: Arc<Shared<F>>,
    fetcher: Arc<F>,
    store: Arc<FsStorage>,
    robots: Arc<RobotsCache>,
    tlds: Vec<String>,
    seeds: Vec<CanonicalUrl>,
    max_workers: u32,
    stop: StopHandle,
}

impl Coordinator<HttpFetcher> {
    /// Creates a coordinator that fetches over HTTP
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Seeds are admitted and the crawl is ready to run
    /// * `Err(CrawlError)` - The TLD table, a seed file or the HTTP client failed
    pub fn new(config: Config) -> Result<Self, CrawlError> {
        let fetcher = HttpFetcher::new(&config.user_agent, config.crawler.request_timeout())?
            .with_max_body_bytes(config.crawler.max_body_bytes);
        Self::with_fetcher(config, fetcher)
    }
}

impl<F: Fetcher> Coordinator<F> {
    /// Creates a coordinator around any [`Fetcher`]
    ///
    /// Everything that can make the run fail on configuration is checked
    /// here: the TLD table is loaded and the seed sources are read. Seeds
    /// that do not normalize are logged and skipped.
    pub fn with_fetcher(config: Config, fetcher: F) -> Result<Self, CrawlError> {
        let tlds = load_tld_table(Path::new(&config.output.tld_table))?;
        tracing::info!("Loaded {} TLDs from {}", tlds.len(), config.output.tld_table);

        let raw_seeds = collect_seeds(&config)?;
        let frontier = Arc::new(Frontier::new());
        let mut seeds = Vec::new();
        for raw in &raw_seeds {
            match normalize_url(raw, &config.identity) {
                Ok(url) => {
                    if frontier.admit(url.clone()) {
                        seeds.push(url);
                    }
                }
                Err(e) => tracing::warn!("Skipping seed {}: {}", raw, e),
            }
        }
        tracing::info!("Admitted {} of {} seed URLs", seeds.len(), raw_seeds.len());

        let fetcher = Arc::new(fetcher);
        let store = Arc::new(FsStorage::new(
            &config.output.domains_dir,
            config.output.persist_body,
            &config.identity,
        ));
        let robots = Arc::new(RobotsCache::new());

        let pipeline = Pipeline::new(
            fetcher.clone(),
            store.clone(),
            robots.clone(),
            frontier.clone(),
            config.identity,
            LinkScope::from_follow_relative(config.crawler.follow_relative_links),
        );
        let scheduler = Scheduler::new(config.crawler.clone(), frontier.clone(), robots.clone());

        let shared = Arc::new(Shared {
            frontier,
            scheduler,
            pipeline,
            stats: CrawlStats::new(),
            retry: RetryPolicy::from_config(&config.crawler),
        });

        Ok(Self {
            shared,
            fetcher,
            store,
            robots,
            tlds,
            seeds,
            max_workers: config.crawler.max_workers,
            stop: StopHandle::new(),
        })
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn frontier(&self) -> &Frontier {
        &self.shared.frontier
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn state(&self) -> SchedulerState {
        self.shared.scheduler.state()
    }

    pub fn seeds(&self) -> &[CanonicalUrl] {
        &self.seeds
    }

    /// Where each seed's record would be written
    pub fn planned_paths(&self) -> Vec<(CanonicalUrl, PathBuf)> {
        self.seeds
            .iter()
            .map(|url| (url.clone(), self.store.path_for(url)))
            .collect()
    }

    /// Runs the crawl until the frontier drains or a stop is requested
    ///
    /// This method:
    /// 1. Pre-creates the TLD directories
    /// 2. Spawns `max-workers` workers
    /// 3. Waits for all of them, moving to `Draining` on stop
    /// 4. Moves to `Stopped` and returns the final statistics
    pub async fn run(&self) -> Result<CrawlStatistics, CrawlError> {
        let started = Instant::now();
        self.store.prepare_tld_directories(&self.tlds)?;

        self.shared.scheduler.transition(SchedulerState::Running)?;
        tracing::info!(
            "Starting crawl with {} workers, {} URLs pending",
            self.max_workers,
            self.shared.frontier.pending_len()
        );

        let watcher = {
            let shared = Arc::clone(&self.shared);
            let mut stop = self.stop.subscribe();
            tokio::spawn(async move {
                stop_requested(&mut stop).await;
                tracing::info!("Stop requested, abandoning in-flight work");
                shared.scheduler.begin_draining();
                shared.frontier.close();
            })
        };

        let mut workers = JoinSet::new();
        for id in 0..self.max_workers {
            workers.spawn(worker_loop(id, Arc::clone(&self.shared), self.stop.subscribe()));
        }

        let mut failure = None;
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker task failed: {}", e);
                failure.get_or_insert(CrawlError::Worker(e.to_string()));
            }
        }
        watcher.abort();

        self.shared.scheduler.transition(SchedulerState::Stopped)?;

        let stats = self.shared.stats.snapshot(
            self.shared.frontier.seen_len() as u64,
            self.store.directories_created(),
            self.robots.fetch_count(),
            started.elapsed(),
        );

        tracing::info!(
            "Crawl finished: {} pages processed, {} written in {:?}",
            stats.pages_processed,
            stats.pages_written,
            stats.elapsed
        );

        match failure {
            Some(e) => Err(e),
            None => Ok(stats),
        }
    }
}

/// Runs a complete crawl over HTTP
///
/// # Example
///
/// ```no_run
/// use tld_crawler::config::load_config;
/// use tld_crawler::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("crawler.toml"))?;
/// let stats = run_crawl(config).await?;
/// println!("{} pages", stats.pages_processed);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlStatistics, CrawlError> {
    Coordinator::new(config)?.run().await
}
