//! HTML parser for extracting links and metadata
//!
//! This module handles parsing HTML content to extract:
//! - Anchor links to follow
//! - Page title (for logging)

use scraper::{Html, Selector};
use url::Url;

/// Which hrefs are turned into candidate links
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkScope {
    /// Only hrefs that are already absolute http(s) URLs
    AbsoluteOnly,
    /// Relative hrefs are resolved against the page URL as well
    ResolveRelative,
}

impl LinkScope {
    pub fn from_follow_relative(follow_relative_links: bool) -> Self {
        if follow_relative_links {
            LinkScope::ResolveRelative
        } else {
            LinkScope::AbsoluteOnly
        }
    }
}

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Candidate links in document order (absolute, not yet normalized)
    pub links: Vec<String>,
}

/// Parses HTML content and extracts anchor links and the title
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `href` of every `<a>` element, including `rel="nofollow"` links
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` links and data URIs
/// - Fragment-only links (same page anchors)
/// - Relative hrefs, unless `scope` is [`LinkScope::ResolveRelative`]
/// - Anything that is not http(s) after resolution
///
/// Malformed markup never fails: the HTML parser recovers and whatever
/// anchors it finds are returned.
///
/// # Example
///
/// ```
/// use tld_crawler::crawler::{parse_html, LinkScope};
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head>
///     <body><a href="http://b.test/y">Link</a></body></html>"#;
/// let base_url = Url::parse("http://a.test/").unwrap();
/// let parsed = parse_html(html, &base_url, LinkScope::AbsoluteOnly);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links, vec!["http://b.test/y".to_string()]);
/// ```
pub fn parse_html(html: &str, base_url: &Url, scope: LinkScope) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        links: extract_links(&document, base_url, scope),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_links(document: &Html, base_url: &Url, scope: LinkScope) -> Vec<String> {
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&a_selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url, scope))
        .collect()
}

/// Resolves a link href to an absolute URL and validates it
fn resolve_link(href: &str, base_url: &Url, scope: LinkScope) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    let absolute_url = match Url::parse(href) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) if scope == LinkScope::ResolveRelative => {
            base_url.join(href).ok()?
        }
        Err(_) => return None,
    };

    if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
        Some(absolute_url.to_string())
    } else {
        None
    }
}
