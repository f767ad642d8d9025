//! Fetch, decode, store, extract
//!
//! Every stage reports what it decided as a value. Only a failed fetch is
//! an error, and the caller decides whether to retry it.

use crate::crawler::encoding::decode_body;
use crate::crawler::fetcher::{FetchError, Fetcher};
use crate::crawler::frontier::Frontier;
use crate::crawler::parser::{parse_html, LinkScope};
use crate::robots::RobotsCache;
use crate::storage::{PageRecord, PageStore, WriteOutcome};
use crate::url::{normalize_url, CanonicalUrl, IdentityPolicy};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

/// Why a stage did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A record for the URL already exists on disk
    AlreadyStored,
    /// robots.txt disallows the page's own URL
    RobotsDisallowed,
    /// The response is not an HTML document
    NotHtml,
}

/// What happened to the page record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOutcome {
    Written(PathBuf),
    Skipped(SkipReason),
    /// The filesystem refused; the page was still processed
    Failed(String),
}

/// What happened to the page's links
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    Followed {
        /// Candidate links on the page
        found: u64,
        /// Links newly admitted to the frontier
        admitted: u64,
        /// Links whose target robots.txt disallowed them
        blocked: u64,
    },
    Skipped(SkipReason),
}

/// Outcome of processing one URL
#[derive(Debug, Clone)]
pub struct PageReport {
    pub url: CanonicalUrl,
    pub status: u16,
    pub encoding: &'static str,
    pub title: Option<String>,
    pub storage: StorageOutcome,
    pub discovery: Discovery,
}

/// Shared, stateless-per-page processing steps
pub struct Pipeline<F: Fetcher> {
    fetcher: Arc<F>,
    store: Arc<dyn PageStore>,
    robots: Arc<RobotsCache>,
    frontier: Arc<Frontier>,
    identity: IdentityPolicy,
    link_scope: LinkScope,
}

impl<F: Fetcher> Pipeline<F> {
    pub fn new(
        fetcher: Arc<F>,
        store: Arc<dyn PageStore>,
        robots: Arc<RobotsCache>,
        frontier: Arc<Frontier>,
        identity: IdentityPolicy,
        link_scope: LinkScope,
    ) -> Self {
        Self {
            fetcher,
            store,
            robots,
            frontier,
            identity,
            link_scope,
        }
    }

    /// Processes one URL
    ///
    /// # Steps
    ///
    /// 1. Fetch; a non-2xx status becomes [`FetchError::Status`]
    /// 2. Decode the body
    /// 3. Write the record unless one exists
    /// 4. Stop here if the Content-Type names something other than HTML
    /// 5. Check the page's own URL against robots.txt; stop here if disallowed
    /// 6. Extract links, normalize them, drop already-seen keys, check each
    ///    target's robots.txt and admit the rest
    ///
    /// # Returns
    ///
    /// * `Ok(PageReport)` - The page was fetched; see the report for what happened
    /// * `Err(FetchError)` - The fetch failed; nothing was stored or admitted
    pub async fn process(&self, url: &CanonicalUrl) -> Result<PageReport, FetchError> {
        let response = self.fetcher.fetch(url.as_url()).await?;
        if !response.is_success() {
            return Err(FetchError::Status(response.status));
        }

        let tld = url.tld();
        let decoded = decode_body(
            &response.body,
            response.declared_encoding.as_deref(),
            Some(&tld),
        );

        let storage = self.store_page(url, &decoded.text, decoded.encoding_name());

        let (title, discovery) = if is_html(response.content_type()) {
            let parsed = parse_html(&decoded.text, &response.final_url, self.link_scope);
            let discovery = self.discover(url, &response.final_url, parsed.links).await;
            (parsed.title, discovery)
        } else {
            tracing::debug!(
                "{} is {}, not extracting links",
                url,
                response.content_type().unwrap_or_default()
            );
            (None, Discovery::Skipped(SkipReason::NotHtml))
        };

        Ok(PageReport {
            url: url.clone(),
            status: response.status,
            encoding: decoded.encoding_name(),
            title,
            storage,
            discovery,
        })
    }

    fn store_page(&self, url: &CanonicalUrl, text: &str, encoding: &str) -> StorageOutcome {
        let path = self.store.path_for(url);
        if self.store.exists(&path) {
            tracing::debug!("Record for {} already at {}", url, path.display());
            return StorageOutcome::Skipped(SkipReason::AlreadyStored);
        }

        let record = PageRecord::new(url, path, text.to_string(), encoding);
        match self.store.write_record(&record) {
            Ok(WriteOutcome::Written) => StorageOutcome::Written(record.storage_path),
            Ok(WriteOutcome::AlreadyExists) => StorageOutcome::Skipped(SkipReason::AlreadyStored),
            Err(e) => {
                tracing::warn!("Failed to store {}: {}", url, e);
                StorageOutcome::Failed(e.to_string())
            }
        }
    }

    async fn discover(&self, url: &CanonicalUrl, base: &Url, links: Vec<String>) -> Discovery {
        let own_policy = self.robots.policy_for(url, self.fetcher.as_ref()).await;
        if !own_policy.allows(url) {
            tracing::debug!("robots.txt disallows {}, not following its links", url);
            return Discovery::Skipped(SkipReason::RobotsDisallowed);
        }

        let found = links.len() as u64;
        let mut admitted = 0;
        let mut blocked = 0;
        let mut handled: HashSet<String> = HashSet::new();

        for link in links {
            let target = match normalize_url(&link, &self.identity) {
                Ok(target) => target,
                Err(e) => {
                    tracing::trace!("Skipping link {} on {}: {}", link, base, e);
                    continue;
                }
            };

            if !handled.insert(target.key().to_string()) || self.frontier.contains(target.key()) {
                continue;
            }

            let policy = self.robots.policy_for(&target, self.fetcher.as_ref()).await;
            if !policy.allows(&target) {
                tracing::debug!("robots.txt disallows {}", target);
                blocked += 1;
                continue;
            }

            if self.frontier.admit(target) {
                admitted += 1;
            }
        }

        Discovery::Followed {
            found,
            admitted,
            blocked,
        }
    }
}

/// Whether a Content-Type may carry links
///
/// A missing header is treated as HTML.
fn is_html(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return true;
    };
    let mime = content_type.split(';').next().unwrap_or("").trim();
    mime.eq_ignore_ascii_case("text/html") || mime.eq_ignore_ascii_case("application/xhtml+xml")
}
