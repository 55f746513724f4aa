use crate::UrlError;
use url::Url;

/// Resolves a link found on a page into an absolute URL
///
/// # Resolution Rules
///
/// 1. A candidate that already starts with `http` is returned unchanged
/// 2. Anything else is joined against `base` using standard URL resolution:
///    - `page` and `../page` resolve relative to the base path
///    - `/page` replaces the base path
///    - `//host/page` keeps only the base scheme
///
/// # Arguments
///
/// * `base` - The absolute URL of the page the link was found on
/// * `candidate` - The raw link target
///
/// # Returns
///
/// * `Ok(String)` - The absolute URL
/// * `Err(UrlError::Malformed)` - The base or the joined result is not a valid URL
///
/// # Examples
///
/// ```
/// use reader_crawler::url::resolve;
///
/// let url = resolve("https://ex.com/docs/intro", "../guide").unwrap();
/// assert_eq!(url, "https://ex.com/guide");
///
/// let url = resolve("https://ex.com/docs/intro", "https://other.com/x").unwrap();
/// assert_eq!(url, "https://other.com/x");
/// ```
pub fn resolve(base: &str, candidate: &str) -> Result<String, UrlError> {
    if candidate.starts_with("http") {
        return Ok(candidate.to_string());
    }

    let malformed = |reason: String| UrlError::Malformed {
        base: base.to_string(),
        candidate: candidate.to_string(),
        reason,
    };

    let base_url = Url::parse(base).map_err(|e| malformed(e.to_string()))?;
    let resolved = base_url
        .join(candidate)
        .map_err(|e| malformed(e.to_string()))?;

    Ok(resolved.to_string())
}

/// Removes the fragment identifier (everything from the first `#`)
pub fn strip_fragment(link: &str) -> &str {
    match link.find('#') {
        Some(index) => &link[..index],
        None => link,
    }
}

/// Checks that a string is an absolute URL with an `http` or `https` scheme
///
/// # Examples
///
/// ```
/// use reader_crawler::url::is_valid_http_url;
///
/// assert!(is_valid_http_url("https://example.com"));
/// assert!(!is_valid_http_url("ftp://example.com"));
/// assert!(!is_valid_http_url("example.com"));
/// ```
pub fn is_valid_http_url(s: &str) -> bool {
    match Url::parse(s) {
        Ok(url) => url.scheme() == "http" || url.scheme() == "https",
        Err(_) => false,
    }
}
