//! Link frontier
//!
//! The ordered, deduplicated collection of in-domain links discovered during
//! a session. The operator picks which of them to crawl next.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A discovered link the operator may select
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCandidate {
    /// Resolved absolute URL
    pub url: String,

    /// Anchor label, or the URL itself when the label was empty
    pub text: String,

    /// Whether the operator chose this link for the next crawl
    #[serde(default)]
    pub selected: bool,
}

impl LinkCandidate {
    /// Creates an unselected candidate, falling back to the URL as its label
    pub fn new(url: impl Into<String>, text: &str) -> Self {
        let url = url.into();
        let text = if text.trim().is_empty() {
            url.clone()
        } else {
            text.to_string()
        };
        Self {
            url,
            text,
            selected: false,
        }
    }
}

/// Insertion-ordered set of link candidates, unique by URL
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<LinkCandidate>", into = "Vec<LinkCandidate>")]
pub struct Frontier {
    links: Vec<LinkCandidate>,
    known: HashSet<String>,
}

impl From<Vec<LinkCandidate>> for Frontier {
    fn from(links: Vec<LinkCandidate>) -> Self {
        let mut frontier = Self::default();
        for link in links {
            frontier.push(link);
        }
        frontier
    }
}

impl From<Frontier> for Vec<LinkCandidate> {
    fn from(frontier: Frontier) -> Self {
        frontier.links
    }
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a candidate unless its URL is already known
    ///
    /// Returns true if the candidate was added.
    pub fn push(&mut self, candidate: LinkCandidate) -> bool {
        if !self.known.insert(candidate.url.clone()) {
            return false;
        }
        self.links.push(candidate);
        true
    }

    pub fn contains(&self, url: &str) -> bool {
        self.known.contains(url)
    }

    /// Flips the selection of the candidate at `index`
    ///
    /// Returns the new selection state, or None if the index is out of range.
    pub fn toggle(&mut self, index: usize) -> Option<bool> {
        let link = self.links.get_mut(index)?;
        link.selected = !link.selected;
        Some(link.selected)
    }

    /// Selects or deselects every candidate
    pub fn select_all(&mut self, selected: bool) {
        for link in &mut self.links {
            link.selected = selected;
        }
    }

    /// Selects every candidate whose URL contains `pattern`
    ///
    /// Returns the number of candidates matched.
    pub fn select_matching(&mut self, pattern: &str) -> usize {
        let mut matched = 0;
        for link in self.links.iter_mut().filter(|l| l.url.contains(pattern)) {
            link.selected = true;
            matched += 1;
        }
        matched
    }

    /// URLs of the selected candidates, in frontier order
    pub fn selected_urls(&self) -> Vec<String> {
        self.links
            .iter()
            .filter(|link| link.selected)
            .map(|link| link.url.clone())
            .collect()
    }

    pub fn selected_count(&self) -> usize {
        self.links.iter().filter(|link| link.selected).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LinkCandidate> {
        self.links.iter()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn clear(&mut self) {
        self.links.clear();
        self.known.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frontier_with(urls: &[&str]) -> Frontier {
        let mut frontier = Frontier::new();
        for url in urls {
            frontier.push(LinkCandidate::new(*url, ""));
        }
        frontier
    }

    #[test]
    fn test_label_falls_back_to_url() {
        let link = LinkCandidate::new("https://ex.com/a", "  ");
        assert_eq!(link.text, "https://ex.com/a");
        assert!(!link.selected);

        let link = LinkCandidate::new("https://ex.com/a", "Docs");
        assert_eq!(link.text, "Docs");
    }

    #[test]
    fn test_push_deduplicates_by_url() {
        let mut frontier = Frontier::new();
        assert!(frontier.push(LinkCandidate::new("https://ex.com/a", "First")));
        assert!(!frontier.push(LinkCandidate::new("https://ex.com/a", "Second")));

        assert_eq!(frontier.len(), 1);
        assert_eq!(frontier.iter().next().unwrap().text, "First");
    }

    #[test]
    fn test_push_preserves_insertion_order() {
        let mut frontier = frontier_with(&["https://ex.com/b"]);
        frontier.push(LinkCandidate::new("https://ex.com/c", ""));
        frontier.push(LinkCandidate::new("https://ex.com/b", ""));
        frontier.push(LinkCandidate::new("https://ex.com/a", ""));

        let urls: Vec<_> = frontier.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["https://ex.com/b", "https://ex.com/c", "https://ex.com/a"]);
    }

    #[test]
    fn test_toggle_and_selected_urls() {
        let mut frontier = frontier_with(&["https://ex.com/a", "https://ex.com/b"]);

        assert_eq!(frontier.toggle(1), Some(true));
        assert_eq!(frontier.selected_urls(), vec!["https://ex.com/b".to_string()]);

        assert_eq!(frontier.toggle(1), Some(false));
        assert!(frontier.selected_urls().is_empty());

        assert_eq!(frontier.toggle(5), None);
    }

    #[test]
    fn test_select_all_and_matching() {
        let mut frontier = frontier_with(&[
            "https://ex.com/docs/a",
            "https://ex.com/blog/b",
            "https://ex.com/docs/c",
        ]);

        assert_eq!(frontier.select_matching("/docs/"), 2);
        assert_eq!(frontier.selected_count(), 2);

        frontier.select_all(true);
        assert_eq!(frontier.selected_count(), 3);

        frontier.select_all(false);
        assert_eq!(frontier.selected_count(), 0);
    }

    #[test]
    fn test_serde_roundtrip_keeps_selection() {
        let mut frontier = frontier_with(&["https://ex.com/a", "https://ex.com/b"]);
        frontier.toggle(0);

        let json = serde_json::to_string(&frontier).unwrap();
        let restored: Frontier = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.len(), 2);
        assert!(restored.contains("https://ex.com/b"));
        assert_eq!(restored.selected_urls(), vec!["https://ex.com/a".to_string()]);
    }

    #[test]
    fn test_clear() {
        let mut frontier = frontier_with(&["https://ex.com/a"]);
        frontier.clear();
        assert!(frontier.is_empty());
        assert!(frontier.push(LinkCandidate::new("https://ex.com/a", "")));
    }
}
