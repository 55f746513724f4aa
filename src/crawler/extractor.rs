//! Link extraction from reader-proxy content
//!
//! The proxy returns a markdown rendering of a page that may still carry raw
//! HTML. This module pulls links out of both:
//! - Inline markdown links: `[label](target)`
//! - HTML anchors: `<a href="target">label</a>`

use crate::url::strip_fragment;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::OnceLock;

/// A link found in page content, before resolution against the page URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    /// Link target with any fragment removed; may be relative
    pub url: String,

    /// Link label, or the target itself when the label is empty
    pub text: String,
}

fn markdown_link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("markdown link pattern is valid")
    })
}

/// Extracts the links contained in page content
///
/// # Extraction Rules
///
/// - Markdown links are scanned first, then HTML anchors with an `href`
/// - Fragments (`#section`) are removed from every target
/// - Targets that are empty after trimming are dropped
/// - Labels are trimmed; a label that is blank after trimming (`[ ](/x)`)
///   falls back to the target
/// - Duplicates are dropped by exact target string; the first label wins
///
/// Both scanners run in linear time, so arbitrarily large content is safe.
///
/// # Example
///
/// ```
/// use reader_crawler::crawler::extract_links;
///
/// let links = extract_links(r#"[Docs](/docs#top) and <a href="/blog">Blog</a>"#);
/// assert_eq!(links.len(), 2);
/// assert_eq!(links[0].url, "/docs");
/// assert_eq!(links[1].text, "Blog");
/// ```
pub fn extract_links(content: &str) -> Vec<ExtractedLink> {
    let mut links = Vec::new();
    let mut seen = HashSet::new();

    let candidates = extract_markdown_links(content)
        .into_iter()
        .chain(extract_html_links(content));

    for (target, label) in candidates {
        let url = strip_fragment(&target).trim();
        if url.is_empty() || !seen.insert(url.to_string()) {
            continue;
        }

        let text = label.trim();
        let text = if text.is_empty() { url } else { text };

        links.push(ExtractedLink {
            url: url.to_string(),
            text: text.to_string(),
        });
    }

    links
}

/// Finds `[label](target)` pairs in document order
fn extract_markdown_links(content: &str) -> Vec<(String, String)> {
    markdown_link_pattern()
        .captures_iter(content)
        .map(|caps| (caps[2].to_string(), caps[1].to_string()))
        .collect()
}

/// Finds `<a href>` anchors and their text in document order
fn extract_html_links(content: &str) -> Vec<(String, String)> {
    // Cheap guard: most reader output is plain markdown
    if !content.contains("<a") && !content.contains("<A") {
        return Vec::new();
    }

    let fragment = Html::parse_fragment(content);
    let mut links = Vec::new();

    if let Ok(selector) = Selector::parse("a[href]") {
        for element in fragment.select(&selector) {
            if let Some(href) = element.value().attr("href") {
                let text = element.text().collect::<String>();
                links.push((href.to_string(), text));
            }
        }
    }

    links
}
