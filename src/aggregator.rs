//! Per-query accumulation, de-duplication and the JSON output document.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::processor::{summarize, QuerySummary};
use crate::record::PlaceRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub added: usize,
    pub duplicates: usize,
}

/// Results keyed by query, merged across repeated searches of that query.
///
/// Within one query no two records share a [`PlaceRecord::dedup_key`]; the
/// first one seen is kept and merged records are ranked 1..n in merge order.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    queries: Vec<String>,
    results: BTreeMap<String, Vec<PlaceRecord>>,
    seen: BTreeMap<String, HashSet<String>>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one batch of records for `query`, tagging them with `location`
    /// when given.
    pub fn merge(&mut self, query: &str, location: Option<&str>, batch: Vec<PlaceRecord>) -> MergeStats {
        if !self.results.contains_key(query) {
            self.queries.push(query.to_string());
        }
        let merged = self.results.entry(query.to_string()).or_default();
        let seen = self.seen.entry(query.to_string()).or_default();

        let mut stats = MergeStats::default();
        for mut record in batch {
            if !seen.insert(record.dedup_key()) {
                stats.duplicates += 1;
                continue;
            }
            if let Some(loc) = location {
                record.search_location = Some(loc.to_string());
            }
            record.rank = merged.len() + 1;
            merged.push(record);
            stats.added += 1;
        }

        info!(
            "📊 '{}'{}: +{} ({} duplicates), {} total",
            query,
            location.map(|l| format!(" @ {l}")).unwrap_or_default(),
            stats.added,
            stats.duplicates,
            merged.len()
        );
        stats
    }

    /// Registers a query that produced nothing so it still appears in output.
    pub fn touch(&mut self, query: &str) {
        if !self.results.contains_key(query) {
            self.queries.push(query.to_string());
            self.results.insert(query.to_string(), Vec::new());
        }
    }

    pub fn records(&self, query: &str) -> &[PlaceRecord] {
        self.results.get(query).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Queries in the order they were first merged.
    pub fn queries(&self) -> &[String] {
        &self.queries
    }

    pub fn total(&self) -> usize {
        self.results.values().map(Vec::len).sum()
    }

    pub fn into_document(self, timestamp: String) -> OutputDocument {
        let summary = summarize(&self.results);
        let total_places = self.total();
        OutputDocument {
            timestamp,
            keywords: self.queries,
            results: self.results,
            total_places,
            summary,
        }
    }
}

/// The structured artifact written at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputDocument {
    pub timestamp: String,
    pub keywords: Vec<String>,
    pub results: BTreeMap<String, Vec<PlaceRecord>>,
    pub total_places: usize,
    #[serde(default)]
    pub summary: Vec<QuerySummary>,
}

impl OutputDocument {
    /// Writes the document as pretty JSON, replacing any existing file.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("💾 wrote {} places to {}", self.total_places, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(name: &str, address: &str) -> PlaceRecord {
        PlaceRecord {
            rank: 1,
            name: name.to_string(),
            address: address.to_string(),
            search_query: "카페".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_duplicate_key_keeps_first() {
        let mut agg = ResultAggregator::new();
        let mut first = place("스타벅스", "역삼동 1");
        first.phone = "02-1".to_string();
        let mut second = place("스타벅스", "역삼동 1");
        second.phone = "02-2".to_string();

        let stats = agg.merge("카페", Some("서울 강남"), vec![first]);
        assert_eq!(stats.added, 1);
        let stats = agg.merge("카페", Some("서울 홍대"), vec![second]);
        assert_eq!(stats, MergeStats { added: 0, duplicates: 1 });

        let records = agg.records("카페");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].phone, "02-1");
        assert_eq!(records[0].search_location.as_deref(), Some("서울 강남"));
    }

    #[test]
    fn test_same_name_different_address_is_kept() {
        let mut agg = ResultAggregator::new();
        agg.merge("카페", None, vec![place("스타벅스", "역삼동 1"), place("스타벅스", "서교동 2")]);
        assert_eq!(agg.records("카페").len(), 2);
    }

    #[test]
    fn test_dedup_is_per_query() {
        let mut agg = ResultAggregator::new();
        agg.merge("카페", None, vec![place("스타벅스", "역삼동 1")]);
        agg.merge("커피", None, vec![place("스타벅스", "역삼동 1")]);
        assert_eq!(agg.total(), 2);
        assert_eq!(agg.queries(), ["카페".to_string(), "커피".to_string()]);
    }

    #[test]
    fn test_merged_ranks_are_contiguous() {
        let mut agg = ResultAggregator::new();
        agg.merge("카페", Some("a"), vec![place("A", "1"), place("B", "2")]);
        agg.merge("카페", Some("b"), vec![place("B", "2"), place("C", "3")]);
        let ranks: Vec<usize> = agg.records("카페").iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn test_touch_registers_empty_query() {
        let mut agg = ResultAggregator::new();
        agg.touch("없음");
        let doc = agg.into_document("20250101_000000".to_string());
        assert_eq!(doc.keywords, vec!["없음".to_string()]);
        assert!(doc.results["없음"].is_empty());
        assert_eq!(doc.total_places, 0);
    }

    #[test]
    fn test_write_json_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("results.json");

        let mut agg = ResultAggregator::new();
        agg.merge("카페", None, vec![place("A", "1"), place("B", "2")]);
        agg.into_document("t1".to_string()).write_json(&path).unwrap();

        let mut agg = ResultAggregator::new();
        agg.merge("카페", None, vec![place("C", "3")]);
        agg.into_document("t2".to_string()).write_json(&path).unwrap();

        let written: OutputDocument =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.timestamp, "t2");
        assert_eq!(written.total_places, 1);
        assert_eq!(written.results["카페"][0].name, "C");
    }
}
