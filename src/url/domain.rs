use std::net::IpAddr;

/// TLD directory used for hosts that are IP literals
pub const IP_TLD: &str = "ip";

/// Resolves a hostname to its registrable (root) domain
///
/// Uses the public suffix list, so multi-label suffixes such as `co.jp`
/// are handled. Hosts the list cannot split (`localhost`, a bare suffix)
/// and IP literals resolve to themselves.
///
/// # Examples
///
/// ```
/// use tld_crawler::url::root_domain;
///
/// assert_eq!(root_domain("a.b.example.co.jp"), "example.co.jp");
/// assert_eq!(root_domain("blog.example.com"), "example.com");
/// ```
pub fn root_domain(hostname: &str) -> String {
    let host = hostname.trim_end_matches('.').to_lowercase();

    if is_ip_literal(&host) {
        return host;
    }

    match psl::domain(host.as_bytes()) {
        Some(domain) => String::from_utf8_lossy(domain.as_bytes()).into_owned(),
        None => host,
    }
}

/// Returns the top-level domain label of a root domain
///
/// This is the final label, or [`IP_TLD`] when the root is an IP literal.
pub fn tld(root_domain: &str) -> String {
    if is_ip_literal(root_domain) {
        return IP_TLD.to_string();
    }

    root_domain
        .trim_end_matches('.')
        .rsplit('.')
        .next()
        .unwrap_or(root_domain)
        .to_lowercase()
}

fn is_ip_literal(host: &str) -> bool {
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .is_ok()
}
