//! Selector resolution over an ordered list of candidates.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::scope::DocumentScope;

/// A candidate with more matches than this is taken immediately.
pub const STRONG_MATCH_THRESHOLD: usize = 3;

/// Candidates for one search-result row inside the search frame.
pub const RESULT_SELECTORS: &[&str] = &[
    "ul li",
    "li",
    ".YwYLL",
    "._3XamX",
    ".TYaxT",
    ".CHC5F",
    "[data-id]",
    "div[data-place-id]",
    ".place_bluelink",
    ".item_name",
    ".item",
    ".result",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrength {
    /// More than [`STRONG_MATCH_THRESHOLD`] matches.
    Strong,
    /// Between one and [`STRONG_MATCH_THRESHOLD`] matches; used only when no
    /// candidate was strong.
    Weak,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub selector: String,
    pub count: usize,
    pub strength: MatchStrength,
}

/// Resolves the selector to use for result rows.
///
/// Candidates are tried in order. The first one with more than three matches
/// wins without looking further; otherwise the first candidate that matched
/// anything is returned as a weak fallback. `None` means the page has no
/// results, which callers treat as an empty result set rather than an error.
pub fn resolve<S, C>(scope: &S, candidates: &[C], wait: Duration) -> Option<Resolution>
where
    S: DocumentScope + ?Sized,
    C: AsRef<str>,
{
    let mut fallback: Option<Resolution> = None;

    for candidate in candidates {
        let selector = candidate.as_ref();
        if !scope.wait_for(selector, wait) {
            debug!("selector '{}' did not appear", selector);
            continue;
        }

        let count = match scope.count(selector) {
            Ok(count) => count,
            Err(e) => {
                warn!("selector '{}' could not be counted: {}", selector, e);
                continue;
            }
        };

        if count > STRONG_MATCH_THRESHOLD {
            info!("✓ selector '{}' matched {} elements", selector, count);
            return Some(Resolution {
                selector: selector.to_string(),
                count,
                strength: MatchStrength::Strong,
            });
        }

        if count > 0 && fallback.is_none() {
            debug!("selector '{}' kept as backup ({} elements)", selector, count);
            fallback = Some(Resolution {
                selector: selector.to_string(),
                count,
                strength: MatchStrength::Weak,
            });
        }
    }

    match &fallback {
        Some(res) => info!("⚠ using backup selector '{}' ({} elements)", res.selector, res.count),
        None => warn!("❌ no result selector matched"),
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CrawlError, Result};
    use crate::scope::StaticDocument;
    use std::collections::HashMap;

    /// Scope with a fixed match count per selector.
    struct CountingScope(HashMap<&'static str, usize>);

    impl DocumentScope for CountingScope {
        fn wait_for(&self, selector: &str, _timeout: Duration) -> bool {
            self.0.get(selector).copied().unwrap_or(0) > 0
        }

        fn count(&self, selector: &str) -> Result<usize> {
            Ok(self.0.get(selector).copied().unwrap_or(0))
        }

        fn scroll_to_bottom(&self) -> Result<()> {
            Ok(())
        }

        fn html(&self) -> Result<String> {
            Err(CrawlError::Timeout { what: "html".into() })
        }
    }

    #[test]
    fn test_first_candidate_over_threshold_wins() {
        let scope = CountingScope(HashMap::from([("a", 1), ("b", 5), ("c", 10)]));
        let res = resolve(&scope, &["a", "b", "c"], Duration::ZERO).unwrap();
        assert_eq!(res.selector, "b");
        assert_eq!(res.count, 5);
        assert_eq!(res.strength, MatchStrength::Strong);
    }

    #[test]
    fn test_weak_fallback_is_first_with_any_match() {
        let scope = CountingScope(HashMap::from([("a", 0), ("b", 2), ("c", 3)]));
        let res = resolve(&scope, &["a", "b", "c"], Duration::ZERO).unwrap();
        assert_eq!(res.selector, "b");
        assert_eq!(res.strength, MatchStrength::Weak);
    }

    #[test]
    fn test_exactly_threshold_does_not_win_immediately() {
        let scope = CountingScope(HashMap::from([("a", 3), ("b", 4)]));
        let res = resolve(&scope, &["a", "b"], Duration::ZERO).unwrap();
        assert_eq!(res.selector, "b");
        assert_eq!(res.strength, MatchStrength::Strong);
    }

    #[test]
    fn test_no_match_resolves_to_none() {
        let scope = CountingScope(HashMap::new());
        assert!(resolve(&scope, &["a", "b"], Duration::ZERO).is_none());
        assert!(resolve::<_, &str>(&scope, &[], Duration::ZERO).is_none());
    }

    #[test]
    fn test_invalid_selector_is_skipped() {
        let doc = StaticDocument::new(
            "<div class='x'>1</div><div class='x'>2</div><div class='x'>3</div><div class='x'>4</div>",
        );
        let res = resolve(&doc, &["div[[", ".x"], Duration::ZERO).unwrap();
        assert_eq!(res.selector, ".x");
        assert_eq!(res.count, 4);
    }
}
