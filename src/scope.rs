//! Document scopes: the narrow view of a page the extraction pipeline needs.

use std::time::Duration;

use scraper::{Html, Selector};

use crate::error::{CrawlError, Result};

/// A queryable document, either a live browser tab or a saved snapshot.
///
/// Implementations answer selector queries against the *current* state of
/// the document, so counts may grow between calls while a page lazy-loads.
pub trait DocumentScope {
    /// Waits up to `timeout` for `selector` to match at least one element.
    /// A miss is not an error.
    fn wait_for(&self, selector: &str, timeout: Duration) -> bool;

    /// Number of elements currently matching `selector`.
    fn count(&self, selector: &str) -> Result<usize>;

    /// Scrolls the document to the bottom to trigger lazy loading.
    fn scroll_to_bottom(&self) -> Result<()>;

    /// Serialized HTML of the whole document.
    fn html(&self) -> Result<String>;
}

pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|_| CrawlError::Selector {
        selector: selector.to_string(),
    })
}

/// In-memory HTML document. Scrolling is a no-op.
#[derive(Debug, Clone)]
pub struct StaticDocument {
    html: String,
}

impl StaticDocument {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        Ok(Self::new(std::fs::read_to_string(path)?))
    }
}

impl DocumentScope for StaticDocument {
    fn wait_for(&self, selector: &str, _timeout: Duration) -> bool {
        self.count(selector).map(|n| n > 0).unwrap_or(false)
    }

    fn count(&self, selector: &str) -> Result<usize> {
        let selector = parse_selector(selector)?;
        let document = Html::parse_document(&self.html);
        Ok(document.select(&selector).count())
    }

    fn scroll_to_bottom(&self) -> Result<()> {
        Ok(())
    }

    fn html(&self) -> Result<String> {
        Ok(self.html.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_document_counts_matches() {
        let doc = StaticDocument::new("<ul><li>a</li><li>b</li></ul><p>c</p>");
        assert_eq!(doc.count("li").unwrap(), 2);
        assert_eq!(doc.count(".missing").unwrap(), 0);
        assert!(doc.wait_for("p", Duration::ZERO));
        assert!(!doc.wait_for("table", Duration::ZERO));
    }

    #[test]
    fn test_invalid_selector_is_an_error() {
        let doc = StaticDocument::new("<p>x</p>");
        assert!(matches!(doc.count("p[[["), Err(CrawlError::Selector { .. })));
        assert!(!doc.wait_for("p[[[", Duration::ZERO));
    }
}
