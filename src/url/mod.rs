//! URL handling module
//!
//! This module provides URL normalization into comparable [`CanonicalUrl`]
//! keys and public-suffix aware root domain resolution.

mod domain;
mod normalize;

use serde::Deserialize;
use std::fmt;
use std::hash::{Hash, Hasher};
use url::Url;

// Re-export main functions
pub use domain::{root_domain, tld, IP_TLD};
pub use normalize::normalize_url;

/// Which URL components take part in page identity
///
/// The defaults discard both the query string and the port, so
/// `host:8080/p?x=1` and `host/p` collapse to one page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct IdentityPolicy {
    /// Keep the (filtered, sorted) query string in the key and the fetched URL
    #[serde(rename = "keep-query", default)]
    pub keep_query: bool,

    /// Keep an explicit non-default port in the key
    #[serde(rename = "keep-port", default)]
    pub keep_port: bool,
}

/// A normalized URL and its identity key
///
/// Equality and hashing only look at [`CanonicalUrl::key`]. The port is
/// always retained for fetching even when it is excluded from the key.
#[derive(Debug, Clone)]
pub struct CanonicalUrl {
    url: Url,
    host: String,
    key: String,
}

impl CanonicalUrl {
    pub(crate) fn new(url: Url, host: String, key: String) -> Self {
        Self { url, host, key }
    }

    /// The identity key used by the frontier and dedup set
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The URL to request, including any explicit port
    pub fn as_url(&self) -> &Url {
        &self.url
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// Lowercased hostname without port
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit non-default port, if any
    pub fn port(&self) -> Option<u16> {
        self.url.port()
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.url.query()
    }

    /// Registrable domain of the host
    pub fn root_domain(&self) -> String {
        root_domain(&self.host)
    }

    /// Top-level domain label of the root domain
    pub fn tld(&self) -> String {
        tld(&self.root_domain())
    }

    /// Path plus query, as matched against robots.txt rules
    pub fn robots_path(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_string(),
        }
    }

    /// `<scheme>://<host>[:port]/robots.txt` for this URL's origin
    pub fn robots_url(&self) -> Option<Url> {
        self.url.join("/robots.txt").ok()
    }
}

impl PartialEq for CanonicalUrl {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for CanonicalUrl {}

impl Hash for CanonicalUrl {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}
