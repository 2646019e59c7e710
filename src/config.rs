//! Runtime configuration loaded from the environment.
//!
//! `load_config` reads `.env` first, then parses every `CRAWLER_*` variable
//! through a lookup closure so tests can feed a plain map instead of touching
//! the process environment.

use std::env::VarError;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CrawlError, Result};

/// A named map centre used to bias searches toward one area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchLocation {
    pub name: String,
    pub longitude: f64,
    pub latitude: f64,
}

impl SearchLocation {
    pub fn new(name: &str, longitude: f64, latitude: f64) -> Self {
        Self {
            name: name.to_string(),
            longitude,
            latitude,
        }
    }
}

/// Major city centres searched by the multi-location modes.
pub fn default_locations() -> Vec<SearchLocation> {
    vec![
        SearchLocation::new("서울 강남", 127.0378515499566, 37.4774550570593),
        SearchLocation::new("서울 홍대", 126.9225103, 37.5564147),
        SearchLocation::new("서울 명동", 126.9816468, 37.563692),
        SearchLocation::new("부산 서면", 129.0584861, 35.1576312),
        SearchLocation::new("대구 동성로", 128.5963242, 35.8682327),
    ]
}

/// Keywords crawled when none are given on the command line.
pub fn default_keywords() -> Vec<String> {
    ["강남 맛집", "홍대 카페", "명동 음식점", "서울 관광지"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub base_url: String,
    pub headless: bool,
    pub max_results: usize,
    pub scroll_attempts: u32,
    pub scroll_pause: Duration,
    pub selector_timeout: Duration,
    pub navigation_timeout: Duration,
    pub query_delay: Duration,
    pub output_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Plain-text copy of the log. `None` logs to stdout only.
    pub log_file: Option<PathBuf>,
    /// Dump each search frame's HTML under `debug_html/`.
    pub debug_html: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://map.naver.com".to_string(),
            headless: true,
            max_results: 10,
            scroll_attempts: 5,
            scroll_pause: Duration::from_millis(2000),
            selector_timeout: Duration::from_millis(3000),
            navigation_timeout: Duration::from_millis(30_000),
            query_delay: Duration::from_millis(3000),
            output_dir: PathBuf::from("output"),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8001)),
            log_level: "info".to_string(),
            log_file: Some(PathBuf::from("output/crawler.log")),
            debug_html: false,
        }
    }
}

/// Load configuration from `.env` and the process environment.
pub fn load_config() -> Result<CrawlerConfig> {
    dotenv::dotenv().ok();
    build_config(|key| std::env::var(key))
}

fn build_config<F>(lookup: F) -> Result<CrawlerConfig>
where
    F: Fn(&str) -> std::result::Result<String, VarError>,
{
    let defaults = CrawlerConfig::default();

    let invalid = |var: &str, reason: String| CrawlError::Config {
        var: var.to_string(),
        reason,
    };

    let parse_u64 = |var: &str, default: u64| -> Result<u64> {
        match lookup(var) {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|e| invalid(var, e.to_string())),
            Err(_) => Ok(default),
        }
    };

    let parse_bool = |var: &str| -> Result<Option<bool>> {
        match lookup(var) {
            Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(Some(true)),
                "0" | "false" | "no" | "off" => Ok(Some(false)),
                other => Err(invalid(var, format!("expected a boolean, got \"{other}\""))),
            },
            Err(_) => Ok(None),
        }
    };

    let millis = |var: &str, default: Duration| -> Result<Duration> {
        parse_u64(var, default.as_millis() as u64).map(Duration::from_millis)
    };

    // Hosted deployments have no display; run headless there unless told otherwise.
    let is_production = lookup("RAILWAY_ENVIRONMENT").is_ok() || lookup("PORT").is_ok();
    let headless = parse_bool("CRAWLER_HEADLESS")?.unwrap_or(is_production);

    let bind_addr = match lookup("CRAWLER_BIND_ADDR") {
        Ok(raw) => raw
            .parse::<SocketAddr>()
            .map_err(|e| invalid("CRAWLER_BIND_ADDR", e.to_string()))?,
        Err(_) => defaults.bind_addr,
    };

    let max_results = parse_u64("CRAWLER_MAX_RESULTS", defaults.max_results as u64)? as usize;
    if max_results == 0 {
        return Err(invalid("CRAWLER_MAX_RESULTS", "must be at least 1".to_string()));
    }

    let scroll_attempts = parse_u64("CRAWLER_SCROLL_ATTEMPTS", u64::from(defaults.scroll_attempts))?;
    let scroll_attempts = u32::try_from(scroll_attempts)
        .map_err(|e| invalid("CRAWLER_SCROLL_ATTEMPTS", e.to_string()))?;

    let output_dir = lookup("CRAWLER_OUTPUT_DIR")
        .map(PathBuf::from)
        .unwrap_or(defaults.output_dir);
    // An empty value turns the log file off.
    let log_file = match lookup("CRAWLER_LOG_FILE") {
        Ok(raw) if raw.trim().is_empty() => None,
        Ok(raw) => Some(PathBuf::from(raw.trim())),
        Err(_) => Some(output_dir.join("crawler.log")),
    };

    Ok(CrawlerConfig {
        base_url: lookup("CRAWLER_BASE_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url),
        headless,
        max_results,
        scroll_attempts,
        scroll_pause: millis("CRAWLER_SCROLL_PAUSE_MS", defaults.scroll_pause)?,
        selector_timeout: millis("CRAWLER_SELECTOR_TIMEOUT_MS", defaults.selector_timeout)?,
        navigation_timeout: millis("CRAWLER_NAV_TIMEOUT_MS", defaults.navigation_timeout)?,
        query_delay: millis("CRAWLER_QUERY_DELAY_MS", defaults.query_delay)?,
        output_dir,
        bind_addr,
        log_level: lookup("CRAWLER_LOG_LEVEL").unwrap_or(defaults.log_level),
        log_file,
        debug_html: parse_bool("CRAWLER_DEBUG_HTML")?.unwrap_or(false),
    })
}
