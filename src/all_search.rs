//! Client for the map site's `allSearch` JSON endpoint.
//!
//! This mode needs no browser: it pages through the same search the web UI
//! performs, centred on a coordinate. Any failure ends paging for that search
//! and keeps what was collected so far.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::aggregator::ResultAggregator;
use crate::config::SearchLocation;
use crate::error::{CrawlError, Result};
use crate::record::PlaceRecord;
use crate::stealth;

pub const MAX_PAGES: u32 = 5;
pub const ALL_SEARCH_PATH: &str = "/p/api/search/allSearch";

pub struct AllSearchClient {
    client: Client,
    base_url: String,
    page_delay: Duration,
}

/// Why paging stopped for one search.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PageOutcome {
    Places(Vec<Value>),
    Empty,
    UnexpectedShape,
    Forbidden,
    Status(u16),
}

impl AllSearchClient {
    pub fn new(base_url: &str, timeout: Duration, page_delay: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("ko-KR,ko;q=0.8,en-US;q=0.6,en;q=0.4"),
        );

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(stealth::random_user_agent())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            page_delay,
        })
    }

    fn referer(&self, query: &str) -> String {
        format!(
            "{}/p/search/{}?c=15.00,0,0,0,dh",
            self.base_url,
            urlencoding::encode(query)
        )
    }

    async fn fetch_page(&self, query: &str, location: &SearchLocation, page: u32) -> Result<PageOutcome> {
        let coord = format!("{};{}", location.longitude, location.latitude);
        let boundary = format!("{coord};{coord}");
        let page = page.to_string();
        let url = format!("{}{}", self.base_url, ALL_SEARCH_PATH);

        let response = self
            .client
            .get(&url)
            .header(REFERER, self.referer(query))
            .query(&[
                ("query", query),
                ("type", "all"),
                ("searchCoord", coord.as_str()),
                ("boundary", boundary.as_str()),
                ("page", page.as_str()),
            ])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::FORBIDDEN => return Ok(PageOutcome::Forbidden),
            other => return Ok(PageOutcome::Status(other.as_u16())),
        }

        let body: Value = response.json().await?;
        Ok(match body.pointer("/result/place/list").and_then(Value::as_array) {
            Some(list) if list.is_empty() => PageOutcome::Empty,
            Some(list) => PageOutcome::Places(list.clone()),
            None => PageOutcome::UnexpectedShape,
        })
    }

    /// Pages 1..=5 of one search around `location`.
    pub async fn search(&self, query: &str, location: &SearchLocation) -> Vec<PlaceRecord> {
        let mut results = Vec::new();

        for page in 1..=MAX_PAGES {
            info!("🔍 '{}' page {} ({})", query, page, location.name);
            let places = match self.fetch_page(query, location, page).await {
                Ok(PageOutcome::Places(places)) => places,
                Ok(PageOutcome::Empty) => {
                    info!("   page {}: no more results", page);
                    break;
                }
                Ok(PageOutcome::UnexpectedShape) => {
                    warn!("❌ page {}: unexpected response shape", page);
                    break;
                }
                Ok(PageOutcome::Forbidden) => {
                    warn!("❌ page {}: access denied (403)", page);
                    break;
                }
                Ok(PageOutcome::Status(status)) => {
                    let err = CrawlError::UnexpectedStatus {
                        status,
                        url: format!("{}{}", self.base_url, ALL_SEARCH_PATH),
                    };
                    warn!("❌ page {}: {}", page, err);
                    break;
                }
                Err(e) => {
                    warn!("❌ page {} request failed: {}", page, e);
                    break;
                }
            };

            info!("✅ page {}: {} places", page, places.len());
            for place in &places {
                let record = place_to_record(place, results.len() + 1, query);
                results.push(record);
            }

            if page < MAX_PAGES {
                sleep(self.page_delay).await;
            }
        }

        results
    }

    /// Searches `query` around every location, merging into `aggregator` with
    /// name/address de-duplication.
    pub async fn search_locations(
        &self,
        query: &str,
        locations: &[SearchLocation],
        location_delay: Duration,
        aggregator: &mut ResultAggregator,
    ) -> usize {
        aggregator.touch(query);
        for (i, location) in locations.iter().enumerate() {
            info!("📍 {}", location.name);
            let found = self.search(query, location).await;
            aggregator.merge(query, Some(&location.name), found);

            if i + 1 < locations.len() {
                sleep(location_delay).await;
            }
        }
        aggregator.records(query).len()
    }
}

fn string_field(place: &Value, key: &str) -> String {
    match place.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(","),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn optional_field(place: &Value, key: &str) -> Option<String> {
    Some(string_field(place, key)).filter(|s| !s.is_empty())
}

/// Maps one `result.place.list` entry.
pub fn place_to_record(place: &Value, rank: usize, query: &str) -> PlaceRecord {
    PlaceRecord {
        rank,
        name: Some(string_field(place, "name"))
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("장소 {rank}")),
        address: string_field(place, "address"),
        category: string_field(place, "category"),
        phone: string_field(place, "tel"),
        search_query: query.to_string(),
        road_address: optional_field(place, "roadAddress"),
        place_id: optional_field(place, "id"),
        longitude: optional_field(place, "x"),
        latitude: optional_field(place, "y"),
        ..Default::default()
    }
}
