//! Post-crawl cleaning, summary statistics and CSV export.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::record::PlaceRecord;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+\.?\d*").expect("valid regex"));
static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));

pub const CSV_HEADER: [&str; 9] = [
    "search_keyword",
    "rank",
    "name",
    "address",
    "category",
    "rating",
    "review_count",
    "phone",
    "search_location",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Collapses newlines and runs of whitespace into single spaces.
pub fn clean_text(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// First decimal number in a rating label: `"별점4.5점"` becomes `"4.5"`.
pub fn clean_rating(rating: &str) -> String {
    DECIMAL
        .find(rating)
        .map(|m| m.as_str().trim_end_matches('.').to_string())
        .unwrap_or_default()
}

/// First integer in a review label after dropping thousands separators.
pub fn clean_review_count(reviews: &str) -> String {
    let without_commas = reviews.replace(',', "");
    INTEGER
        .find(&without_commas)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

pub fn clean_record(record: &PlaceRecord) -> PlaceRecord {
    PlaceRecord {
        name: clean_text(&record.name),
        address: clean_text(&record.address),
        category: clean_text(&record.category),
        rating: clean_rating(&record.rating),
        review_count: clean_review_count(&record.review_count),
        phone: clean_text(&record.phone),
        raw_text: clean_text(&record.raw_text),
        road_address: record.road_address.as_deref().map(clean_text),
        ..record.clone()
    }
}

pub fn clean_results(results: &BTreeMap<String, Vec<PlaceRecord>>) -> BTreeMap<String, Vec<PlaceRecord>> {
    results
        .iter()
        .map(|(query, records)| (query.clone(), records.iter().map(clean_record).collect()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySummary {
    pub keyword: String,
    pub total_places: usize,
    pub avg_rating: Option<f64>,
    pub avg_reviews: Option<f64>,
    pub categories: Vec<String>,
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Per-query statistics. Ratings and review counts are read after cleaning,
/// so raw labels like `"별점4.5"` still count.
pub fn summarize_query(keyword: &str, records: &[PlaceRecord]) -> QuerySummary {
    let ratings: Vec<f64> = records
        .iter()
        .filter_map(|r| clean_rating(&r.rating).parse().ok())
        .collect();
    let reviews: Vec<f64> = records
        .iter()
        .filter_map(|r| clean_review_count(&r.review_count).parse().ok())
        .collect();

    let mut categories: Vec<String> = Vec::new();
    for record in records {
        let category = clean_text(&record.category);
        if !category.is_empty() && !categories.contains(&category) {
            categories.push(category);
        }
    }

    QuerySummary {
        keyword: keyword.to_string(),
        total_places: records.len(),
        avg_rating: mean(&ratings).map(|v| round_to(v, 2)),
        avg_reviews: mean(&reviews).map(|v| round_to(v, 0)),
        categories,
    }
}

pub fn summarize(results: &BTreeMap<String, Vec<PlaceRecord>>) -> Vec<QuerySummary> {
    results
        .iter()
        .map(|(keyword, records)| summarize_query(keyword, records))
        .collect()
}

#[derive(Serialize)]
struct CsvRow<'a> {
    search_keyword: &'a str,
    rank: usize,
    name: &'a str,
    address: &'a str,
    category: &'a str,
    rating: &'a str,
    review_count: &'a str,
    phone: &'a str,
    search_location: Option<&'a str>,
}

impl<'a> CsvRow<'a> {
    fn new(keyword: &'a str, record: &'a PlaceRecord) -> Self {
        Self {
            search_keyword: keyword,
            rank: record.rank,
            name: &record.name,
            address: &record.address,
            category: &record.category,
            rating: &record.rating,
            review_count: &record.review_count,
            phone: &record.phone,
            search_location: record.search_location.as_deref(),
        }
    }
}

/// Writes every record, flattened by query, to `w`. Prefixed with a UTF-8 BOM
/// so spreadsheet tools detect the encoding.
pub fn write_csv_to<W: Write>(mut w: W, results: &BTreeMap<String, Vec<PlaceRecord>>) -> Result<usize> {
    w.write_all(UTF8_BOM)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::CRLF)
        .from_writer(w);

    writer.write_record(CSV_HEADER)?;
    let mut rows = 0;
    for (keyword, records) in results {
        for record in records {
            writer.serialize(CsvRow::new(keyword, record))?;
            rows += 1;
        }
    }
    writer.flush()?;
    Ok(rows)
}

pub fn write_csv(path: &Path, results: &BTreeMap<String, Vec<PlaceRecord>>) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    let rows = write_csv_to(file, results)?;
    info!("📄 wrote {} rows to {}", rows, path.display());
    Ok(rows)
}
