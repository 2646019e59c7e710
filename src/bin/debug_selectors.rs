//! Prints how many elements each candidate selector matches in the search
//! frame, then saves the frame HTML for offline replay.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use place_crawler::browser::BrowserSession;
use place_crawler::resolver::{resolve, RESULT_SELECTORS};
use place_crawler::{load_config, logging, DocumentScope, StaticDocument};

#[derive(Debug, Parser)]
#[command(name = "debug_selectors")]
#[command(about = "Counts candidate selector matches in the search frame")]
struct Args {
    /// Query to search in a live browser
    #[arg(default_value = "강남 맛집")]
    query: String,

    /// Read a saved frame HTML file instead of launching a browser
    #[arg(long, conflicts_with = "query")]
    html: Option<PathBuf>,
}

const PROBE_SELECTORS: &[&str] = &[
    "div[class*='place']",
    "div[class*='search']",
    "div[class*='list']",
    "div[class*='item']",
    "div[class*='result']",
    "li[class*='place']",
    "li[class*='search']",
    "li[class*='item']",
    "div[class*='Place']",
    "div[class*='Result']",
    "div[class*='List']",
    "a[class*='place']",
    "a[class*='link']",
    "article",
    "section",
    "[role='listitem']",
    "[role='button']",
];

fn probe(scope: &dyn DocumentScope) {
    println!("🔍 probing {} selectors...", PROBE_SELECTORS.len() + RESULT_SELECTORS.len());
    for selector in PROBE_SELECTORS.iter().chain(RESULT_SELECTORS) {
        match scope.count(selector) {
            Ok(0) => {}
            Ok(n) => println!("✅ '{}': {}", selector, n),
            Err(e) => println!("❌ '{}': {}", selector, e),
        }
    }

    match resolve(scope, RESULT_SELECTORS, std::time::Duration::ZERO) {
        Some(r) => println!("\n📋 resolver picks '{}' ({} matches, {:?})", r.selector, r.count, r.strength),
        None => println!("\n📋 resolver found nothing"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config()?;
    logging::init(&config)?;

    if let Some(file) = &args.html {
        let doc = StaticDocument::from_file(file).with_context(|| format!("reading {}", file.display()))?;
        probe(&doc);
        return Ok(());
    }

    let query = args.query;
    println!("🕵️ opening search frame for '{}'", query);

    let session = BrowserSession::launch(&config)?;
    let outcome = async {
        let url = format!("{}/p/search/{}", config.base_url, urlencoding::encode(&query));
        session.navigate(session.main_tab(), &url)?;
        tokio::time::sleep(config.selector_timeout).await;

        let frame = session.open_search_frame(config.navigation_timeout)?;
        tokio::time::sleep(config.selector_timeout).await;
        probe(&frame);

        let html = frame.html()?;
        std::fs::create_dir_all(&config.output_dir)?;
        let path = config.output_dir.join("search_iframe.html");
        std::fs::write(&path, html)?;
        println!("📄 frame HTML saved to {}", path.display());
        frame.close();
        anyhow::Ok(())
    }
    .await;

    session.close();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_flag_and_default_query() {
        let args = Args::try_parse_from(["debug_selectors", "--html", "frame.html"]).unwrap();
        assert_eq!(args.html, Some(PathBuf::from("frame.html")));

        let args = Args::try_parse_from(["debug_selectors"]).unwrap();
        assert_eq!(args.query, "강남 맛집");
        assert!(args.html.is_none());
    }

    #[test]
    fn test_html_and_query_conflict() {
        assert!(Args::try_parse_from(["debug_selectors", "홍대", "--html", "frame.html"]).is_err());
    }
}
