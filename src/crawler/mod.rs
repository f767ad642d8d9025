//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the [`Fetcher`] seam
//! - Charset detection and decoding
//! - HTML parsing and link extraction
//! - The frontier and dedup set
//! - Request scheduling, politeness and retries
//! - Overall crawl coordination

mod coordinator;
mod encoding;
mod fetcher;
mod frontier;
mod parser;
mod pipeline;
mod scheduler;

pub use coordinator::{run_crawl, Coordinator, StopHandle};
pub use encoding::{decode_body, DecodedBody, EncodingSource};
pub use fetcher::{
    build_http_client, charset_from_content_type, user_agent_string, FetchError, FetchResult,
    Fetcher, HttpFetcher, DEFAULT_MAX_BODY_BYTES,
};
pub use frontier::{EntryState, Frontier, Take};
pub use parser::{parse_html, LinkScope, ParsedPage};
pub use pipeline::{Discovery, PageReport, Pipeline, SkipReason, StorageOutcome};
pub use scheduler::{process_with_retry, RetryPolicy, Scheduler};

#[cfg(test)]
pub(crate) use fetcher::testing;
