use crate::url::{CanonicalUrl, IdentityPolicy};
use crate::UrlError;
use url::Url;

/// List of tracking query parameters to remove when queries are kept
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
    "ref",
    "source",
];

/// Normalizes a raw link into a [`CanonicalUrl`]
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything but http and https
/// 3. Lowercase the host; reject an empty host
/// 4. Normalize path:
///    - Remove dot segments (. and ..)
///    - Collapse repeated slashes
///    - Remove trailing slash (except for root /)
///    - Empty path becomes /
/// 5. Remove fragment (everything after #)
/// 6. Drop the query, or, when the policy keeps it, remove tracking
///    parameters and sort the rest
/// 7. Build the identity key from scheme, host and path (plus port and
///    query when the policy keeps them)
///
/// Default ports never appear: the `url` crate drops them while parsing.
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
/// * `policy` - Which optional components take part in identity
///
/// # Returns
///
/// * `Ok(CanonicalUrl)` - Normalized URL
/// * `Err(UrlError)` - Failed to parse or normalize the URL
///
/// # Examples
///
/// ```
/// use tld_crawler::url::{normalize_url, IdentityPolicy};
///
/// let url = normalize_url("http://Example.COM:80/a/", &IdentityPolicy::default()).unwrap();
/// assert_eq!(url.key(), "http://example.com/a");
/// ```
pub fn normalize_url(url_str: &str, policy: &IdentityPolicy) -> Result<CanonicalUrl, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = match url.host_str() {
        Some(host) if !host.is_empty() => host.to_lowercase(),
        _ => return Err(UrlError::MissingDomain),
    };

    if url.host_str() != Some(host.as_str()) {
        url.set_host(Some(&host))
            .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if policy.keep_query && url.query().is_some() {
        let filtered_params = filter_and_sort_query_params(&url);

        if filtered_params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(&filtered_params);
        }
    } else {
        url.set_query(None);
    }

    let key = identity_key(&url, &host, policy);
    Ok(CanonicalUrl::new(url, host, key))
}

fn identity_key(url: &Url, host: &str, policy: &IdentityPolicy) -> String {
    let mut key = format!("{}://{}", url.scheme(), host);

    if policy.keep_port {
        if let Some(port) = url.port() {
            key.push_str(&format!(":{}", port));
        }
    }

    key.push_str(url.path());

    if let Some(query) = url.query() {
        key.push('?');
        key.push_str(query);
    }

    key
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let mut normalized_segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            // Skip empty segments (from multiple slashes) and current directory markers
            "" | "." => continue,
            ".." => {
                normalized_segments.pop();
            }
            _ => normalized_segments.push(segment),
        }
    }

    if normalized_segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", normalized_segments.join("/"))
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));

    params
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_policy() -> IdentityPolicy {
        IdentityPolicy::default()
    }

    fn keep_query() -> IdentityPolicy {
        IdentityPolicy {
            keep_query: true,
            keep_port: false,
        }
    }

    fn key(raw: &str) -> String {
        normalize_url(raw, &default_policy()).unwrap().key().to_string()
    }

    #[test]
    fn test_port_and_case_collapse() {
        assert_eq!(key("http://Example.com:80/a/"), key("http://example.com/a/"));
        assert_eq!(key("http://Example.com:80/a/"), "http://example.com/a");
    }

    #[test]
    fn test_explicit_port_excluded_from_key() {
        assert_eq!(key("http://example.com:8080/p"), key("http://example.com/p"));
    }

    #[test]
    fn test_explicit_port_kept_when_configured() {
        let policy = IdentityPolicy {
            keep_query: false,
            keep_port: true,
        };
        let url = normalize_url("http://example.com:8080/p", &policy).unwrap();
        assert_eq!(url.key(), "http://example.com:8080/p");
    }

    #[test]
    fn test_scheme_is_part_of_identity() {
        assert_ne!(key("http://example.com/p"), key("https://example.com/p"));
    }

    #[test]
    fn test_remove_trailing_slash() {
        assert_eq!(key("https://example.com/page/"), "https://example.com/page");
    }

    #[test]
    fn test_keep_root_slash() {
        assert_eq!(key("https://example.com/"), "https://example.com/");
    }

    #[test]
    fn test_empty_path_becomes_root() {
        assert_eq!(key("https://example.com"), "https://example.com/");
    }

    #[test]
    fn test_remove_fragment() {
        assert_eq!(key("https://example.com/page#section"), "https://example.com/page");
    }

    #[test]
    fn test_query_dropped_by_default() {
        let url = normalize_url("https://example.com/page?id=7", &default_policy()).unwrap();
        assert_eq!(url.key(), "https://example.com/page");
        assert_eq!(url.as_url().as_str(), "https://example.com/page");
    }

    #[test]
    fn test_remove_tracking_params_when_query_kept() {
        let result =
            normalize_url("https://example.com/page?utm_source=twitter", &keep_query()).unwrap();
        assert_eq!(result.key(), "https://example.com/page");
    }

    #[test]
    fn test_sort_query_params_when_kept() {
        let result = normalize_url("https://example.com/page?b=2&a=1", &keep_query()).unwrap();
        assert_eq!(result.key(), "https://example.com/page?a=1&b=2");
    }

    #[test]
    fn test_encoded_query_values_survive() {
        let escaped = normalize_url("http://x.test/p?a=1%26b%3D2", &keep_query()).unwrap();
        let split = normalize_url("http://x.test/p?a=1&b=2", &keep_query()).unwrap();

        assert_ne!(escaped.key(), split.key());
        assert_eq!(escaped.as_url().as_str(), "http://x.test/p?a=1%26b%3D2");
        let (name, value) = escaped.as_url().query_pairs().next().unwrap();
        assert_eq!((name.as_ref(), value.as_ref()), ("a", "1&b=2"));
    }

    #[test]
    fn test_mixed_query_params() {
        let result = normalize_url(
            "https://example.com/page?keep=yes&utm_medium=email&another=value&fbclid=123",
            &keep_query(),
        )
        .unwrap();
        assert_eq!(result.key(), "https://example.com/page?another=value&keep=yes");
    }

    #[test]
    fn test_normalize_path_with_dots() {
        assert_eq!(key("https://example.com/a/../b/./c"), "https://example.com/b/c");
    }

    #[test]
    fn test_multiple_slashes() {
        assert_eq!(
            key("https://example.com///path//to///page"),
            "https://example.com/path/to/page"
        );
    }

    #[test]
    fn test_parent_directory_at_root() {
        assert_eq!(key("https://example.com/../page"), "https://example.com/page");
    }

    #[test]
    fn test_path_case_preserved() {
        assert_eq!(key("https://EXAMPLE.COM/Page"), "https://example.com/Page");
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://example.com/page", &default_policy());
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));
    }

    #[test]
    fn test_mailto_rejected() {
        let result = normalize_url("mailto:someone@example.com", &default_policy());
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));
    }

    #[test]
    fn test_malformed_url() {
        assert!(normalize_url("not a url", &default_policy()).is_err());
    }

    #[test]
    fn test_empty_host_rejected() {
        assert!(normalize_url("http://:80/path", &default_policy()).is_err());
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        assert_eq!(key("  http://example.com/a  "), "http://example.com/a");
    }
}
