//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests returning raw bytes plus the declared charset
//! - Error classification into transient and permanent failures
//!
//! Everything above this layer talks to the network through the [`Fetcher`]
//! trait, so pages and robots.txt files can be served from memory in tests.

use crate::config::UserAgentConfig;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{redirect::Policy, Client};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Body cap used when none is configured (10 MiB)
pub const DEFAULT_MAX_BODY_BYTES: u64 = 10 * 1024 * 1024;
use url::Url;

/// Raw response of a single GET request
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// HTTP status code
    pub status: u16,
    /// Final URL after redirects
    pub final_url: Url,
    /// Response headers
    pub headers: HeaderMap,
    /// Undecoded body bytes
    pub body: Vec<u8>,
    /// Charset named by the Content-Type header, if any
    pub declared_encoding: Option<String>,
}

impl FetchResult {
    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Content-Type header value, if present and readable
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}

/// Errors produced while fetching a URL
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Transfer interrupted: {0}")]
    Transfer(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Body larger than {limit} bytes (at least {size})")]
    ContentTooLarge { size: u64, limit: u64 },
}

impl FetchError {
    /// Whether retrying the same request may succeed
    ///
    /// | Condition | Transient |
    /// |-----------|-----------|
    /// | Timeout | yes |
    /// | Connection / DNS failure | yes |
    /// | Body transfer reset | yes |
    /// | HTTP 5xx | yes |
    /// | Other HTTP status | no |
    /// | Malformed request, redirect loop | no |
    /// | Body over the size cap | no |
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout(_) | FetchError::Connect(_) | FetchError::Transfer(_) => true,
            FetchError::Status(code) => (500..600).contains(code),
            FetchError::Request(_) | FetchError::ContentTooLarge { .. } => false,
        }
    }

    fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            FetchError::Timeout(error.to_string())
        } else if error.is_connect() {
            FetchError::Connect(error.to_string())
        } else if error.is_body() || error.is_decode() || error.is_request() {
            FetchError::Transfer(error.to_string())
        } else {
            FetchError::Request(error.to_string())
        }
    }
}

/// Source of page and robots.txt bytes
pub trait Fetcher: Send + Sync + 'static {
    /// Issues a GET for `url`
    ///
    /// Any HTTP status is returned as `Ok`; callers decide what a non-2xx
    /// response means for them. `Err` is reserved for transport failures.
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<FetchResult, FetchError>> + Send;
}

/// Formats the crawler's User-Agent header
///
/// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Per-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use tld_crawler::config::UserAgentConfig;
/// use tld_crawler::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "TldCrawler".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Extracts the `charset` parameter from a Content-Type value
///
/// `text/html; charset="Shift_JIS"` yields `shift_jis`.
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'').trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_ascii_lowercase())
        }
    })
}

/// [`Fetcher`] backed by a shared reqwest client
///
/// Bodies are streamed and abandoned once they exceed `max_body_bytes`, so
/// the worker count bounds the memory held by in-flight pages.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_body_bytes: u64,
}

impl HttpFetcher {
    /// Builds the client from the user agent settings
    pub fn new(config: &UserAgentConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self::from_client(build_http_client(config, timeout)?))
    }

    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Sets the largest body accepted before the fetch fails
    pub fn with_max_body_bytes(mut self, max_body_bytes: u64) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Reads the body in chunks, failing once it passes the cap
    async fn read_body(&self, mut response: reqwest::Response) -> Result<Vec<u8>, FetchError> {
        let limit = self.max_body_bytes;
        if let Some(size) = response.content_length().filter(|&len| len > limit) {
            return Err(FetchError::ContentTooLarge { size, limit });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::Transfer(e.to_string()))?
        {
            let size = (body.len() + chunk.len()) as u64;
            if size > limit {
                return Err(FetchError::ContentTooLarge { size, limit });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResult, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let headers = response.headers().clone();
        let declared_encoding = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_from_content_type);

        let body = self.read_body(response).await?;

        tracing::trace!("GET {} -> {} ({} bytes)", url, status, body.len());

        Ok(FetchResult {
            status,
            final_url,
            headers,
            body,
            declared_encoding,
        })
    }
}
