//! Crawl orchestration: one browser session, queries run strictly in order.

use std::path::{Path, PathBuf};

use chrono::Local;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::aggregator::ResultAggregator;
use crate::browser::{BrowserSession, ChromeScope};
use crate::config::CrawlerConfig;
use crate::error::Result;
use crate::extractor::extract_all;
use crate::record::PlaceRecord;
use crate::resolver::{resolve, RESULT_SELECTORS};
use crate::scope::{DocumentScope, StaticDocument};
use crate::scroll::ScrollDriver;
use crate::stealth;

const SEARCH_INPUT: &str = ".input_search";

pub fn search_url(base_url: &str) -> String {
    format!("{}/p/search", base_url.trim_end_matches('/'))
}

/// Resolves, scrolls and extracts from an already-loaded result scope.
///
/// An unresolvable page is an empty result, not an error.
pub async fn collect_from_scope<S>(
    scope: &S,
    config: &CrawlerConfig,
    query: &str,
    limit: usize,
) -> Result<Vec<PlaceRecord>>
where
    S: DocumentScope + ?Sized,
{
    let Some(resolution) = resolve(scope, RESULT_SELECTORS, config.selector_timeout) else {
        warn!("❌ no result selector matched for '{}'", query);
        return Ok(Vec::new());
    };

    let driver = ScrollDriver::new(config.scroll_attempts, config.scroll_pause);
    let outcome = driver
        .run(scope, &resolution.selector, resolution.count, limit)
        .await;
    info!(
        "   {} rows after {} scrolls ({:?})",
        outcome.count, outcome.attempts, outcome.reason
    );

    let html = scope.html()?;
    if config.debug_html {
        dump_html(&config.output_dir, query, &html);
    }
    extract_all(&html, &resolution.selector, limit, query)
}

fn dump_html(output_dir: &Path, query: &str, html: &str) {
    let dir = output_dir.join("debug_html");
    let file = dir.join(format!(
        "{}_{}.html",
        query.replace(char::is_whitespace, "_"),
        Local::now().format("%Y%m%d_%H%M%S")
    ));
    let written = std::fs::create_dir_all(&dir).and_then(|_| std::fs::write(&file, html));
    match written {
        Ok(()) => info!("🐛 frame HTML saved to {}", file.display()),
        Err(e) => warn!("could not save frame HTML: {}", e),
    }
}

/// Runs one query in `session`: search page, frame, resolve, scroll, extract.
pub async fn search_places(
    session: &BrowserSession,
    config: &CrawlerConfig,
    query: &str,
    limit: usize,
) -> Result<Vec<PlaceRecord>> {
    info!("🔍 searching '{}'", query);
    let tab = session.main_tab();
    session.navigate(tab, &search_url(&config.base_url))?;

    tab.wait_for_element_with_custom_timeout(SEARCH_INPUT, config.navigation_timeout)?
        .click()?;
    stealth::type_like_human(tab, query).await?;
    tab.press_key("Enter")?;
    sleep(stealth::jitter(2000..3000)).await;

    let frame = session.open_search_frame(config.navigation_timeout)?;
    let records = collect_from_scope(&frame, config, query, limit).await;
    ChromeScope::close(frame);

    let records = records?;
    info!("✅ '{}': {} places", query, records.len());
    Ok(records)
}

/// Crawls each keyword in order with one browser session.
///
/// A failure on one query is logged and leaves that query empty; the run
/// continues. The browser is closed before returning.
pub async fn crawl_keywords(
    config: &CrawlerConfig,
    keywords: &[String],
    limit: usize,
) -> Result<ResultAggregator> {
    let session = BrowserSession::launch(config)?;
    let mut aggregator = ResultAggregator::new();

    for (i, keyword) in keywords.iter().enumerate() {
        info!("[{}/{}] {}", i + 1, keywords.len(), keyword);
        match search_places(&session, config, keyword, limit).await {
            Ok(records) if !records.is_empty() => {
                aggregator.merge(keyword, None, records);
            }
            Ok(_) => aggregator.touch(keyword),
            Err(e) => {
                error!("❌ '{}' failed: {}", keyword, e);
                aggregator.touch(keyword);
            }
        }

        if i + 1 < keywords.len() {
            sleep(config.query_delay).await;
        }
    }

    session.close();
    Ok(aggregator)
}

/// One query in its own browser session. Unlike [`crawl_keywords`], the
/// query's error is returned to the caller.
pub async fn crawl_single(config: &CrawlerConfig, query: &str, limit: usize) -> Result<Vec<PlaceRecord>> {
    let session = BrowserSession::launch(config)?;
    let records = search_places(&session, config, query, limit).await;
    session.close();
    records
}

/// Runs the extraction pipeline over a saved frame snapshot.
pub async fn replay(
    config: &CrawlerConfig,
    html_path: &Path,
    query: &str,
    limit: usize,
) -> Result<Vec<PlaceRecord>> {
    let document = StaticDocument::from_file(html_path)?;
    let config = CrawlerConfig {
        debug_html: false,
        ..config.clone()
    };
    collect_from_scope(&document, &config, query, limit).await
}

/// `<output_dir>/<stem>_<YYYYmmdd_HHMMSS>.<ext>`
pub fn timestamped_path(output_dir: &Path, stem: &str, ext: &str) -> (String, PathBuf) {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let path = output_dir.join(format!("{stem}_{timestamp}.{ext}"));
    (timestamp, path)
}
