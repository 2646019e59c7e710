//! Place crawler for the Naver Map search UI.
//!
//! The pipeline resolves a result-row selector against a document scope,
//! scrolls until enough rows load, then extracts records from an HTML
//! snapshot. A JSON-endpoint mode and a small HTTP API sit alongside.

pub mod aggregator;
pub mod all_search;
pub mod api;
pub mod browser;
pub mod config;
pub mod crawler;
pub mod error;
pub mod extractor;
pub mod frame;
pub mod logging;
pub mod processor;
pub mod record;
pub mod resolver;
pub mod sanitizer;
pub mod scope;
pub mod scroll;
pub mod stealth;
pub mod workbook;

pub use aggregator::{OutputDocument, ResultAggregator};
pub use config::{load_config, CrawlerConfig, SearchLocation};
pub use error::{CrawlError, Result};
pub use record::PlaceRecord;
pub use scope::{DocumentScope, StaticDocument};
