//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching robots.txt files.
//! Policies are keyed by root domain and matched with the fixed wildcard agent `*`.

mod cache;
mod parser;

pub use cache::{CachedRobots, RobotsCache};
pub use parser::{ParsedRobots, MAX_CRAWL_DELAY};

use crate::crawler::Fetcher;
use crate::url::CanonicalUrl;

/// Agent token used for every robots.txt match
pub const ROBOTS_AGENT: &str = "*";

/// Fetches robots.txt for the origin of `url`
///
/// Failures never propagate: a network error, a non-2xx status or a body
/// that is not UTF-8 all produce an allow-all policy.
///
/// # Arguments
///
/// * `url` - Any URL on the origin whose robots.txt is wanted
/// * `fetcher` - The transport to use
pub async fn fetch_robots<F: Fetcher>(url: &CanonicalUrl, fetcher: &F) -> ParsedRobots {
    let Some(robots_url) = url.robots_url() else {
        tracing::debug!("No robots.txt location for {}", url);
        return ParsedRobots::allow_all();
    };

    let response = match fetcher.fetch(&robots_url).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("robots.txt unavailable at {}: {}", robots_url, e);
            return ParsedRobots::allow_all();
        }
    };

    if !response.is_success() {
        tracing::debug!(
            "robots.txt at {} returned {}, allowing all",
            robots_url,
            response.status
        );
        return ParsedRobots::allow_all();
    }

    match std::str::from_utf8(&response.body) {
        Ok(content) => ParsedRobots::from_content(content),
        Err(e) => {
            tracing::warn!("robots.txt at {} is not valid UTF-8: {}", robots_url, e);
            ParsedRobots::allow_all()
        }
    }
}

/// Checks if a path is allowed by robots.txt
///
/// # Arguments
///
/// * `robots` - The parsed robots.txt data
/// * `path` - The path (plus query) to check
/// * `agent` - The user agent token
///
/// # Returns
///
/// * `true` - If the path is allowed
/// * `false` - If the path is disallowed
pub fn can_fetch(robots: &ParsedRobots, path: &str, agent: &str) -> bool {
    robots.is_allowed(path, agent)
}
