use crate::url::IdentityPolicy;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for the crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub identity: IdentityPolicy,
    #[serde(default)]
    pub seeds: SeedConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of concurrent workers
    #[serde(rename = "max-workers")]
    pub max_workers: u32,

    /// Maximum number of in-flight requests per root domain
    #[serde(rename = "max-domain-concurrency")]
    pub max_domain_concurrency: u32,

    /// Minimum time between requests to the same root domain (milliseconds)
    #[serde(rename = "politeness-delay-ms")]
    pub politeness_delay_ms: u64,

    /// Retries after a transient fetch failure
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Pause between retries (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Largest response body read before the page is dropped (bytes)
    #[serde(rename = "max-body-bytes", default = "default_max_body_bytes")]
    pub max_body_bytes: u64,

    /// Resolve relative hrefs against the page URL instead of ignoring them
    #[serde(rename = "follow-relative-links", default)]
    pub follow_relative_links: bool,

    /// Let a robots.txt Crawl-delay raise the politeness delay
    #[serde(rename = "respect-crawl-delay", default = "default_true")]
    pub respect_crawl_delay: bool,
}

impl CrawlerConfig {
    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root of the `<tld>/<root-domain>/` tree
    #[serde(rename = "domains-dir", default = "default_domains_dir")]
    pub domains_dir: String,

    /// Reference table of known TLDs, pre-created at startup
    #[serde(rename = "tld-table")]
    pub tld_table: String,

    /// Write the decoded page text instead of an empty marker
    #[serde(rename = "persist-body", default)]
    pub persist_body: bool,
}

/// Seed URL sources
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedConfig {
    /// Inline seed URLs
    #[serde(default)]
    pub urls: Vec<String>,

    /// File of seed URLs separated by newlines or commas
    #[serde(default)]
    pub file: Option<String>,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_body_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

fn default_domains_dir() -> String {
    "domains".to_string()
}
