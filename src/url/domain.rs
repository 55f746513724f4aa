use url::Url;

/// Extracts the domain from a URL string
///
/// The host is lowercased by the URL parser for http(s) URLs. Returns `None`
/// when the string does not parse or has no host.
///
/// # Examples
///
/// ```
/// use reader_crawler::url::extract_domain;
///
/// assert_eq!(
///     extract_domain("https://EXAMPLE.com/path"),
///     Some("example.com".to_string())
/// );
/// assert_eq!(extract_domain("not a url"), None);
/// ```
pub fn extract_domain(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
}

/// Checks whether two URLs share a hostname
///
/// Hostnames are compared for exact equality: `blog.example.com` and
/// `example.com` are different domains, and scheme and port are ignored.
/// Never fails; an unparseable URL is simply not on the same domain.
///
/// # Examples
///
/// ```
/// use reader_crawler::url::is_same_domain;
///
/// assert!(is_same_domain("https://ex.com/a", "http://ex.com:8080/b"));
/// assert!(!is_same_domain("https://ex.com/a", "https://sub.ex.com/a"));
/// ```
pub fn is_same_domain(a: &str, b: &str) -> bool {
    match (extract_domain(a), extract_domain(b)) {
        (Some(left), Some(right)) => left == right,
        _ => {
            tracing::trace!("Domain comparison failed for {} / {}", a, b);
            false
        }
    }
}
