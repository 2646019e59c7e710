use thiserror::Error;

/// Errors raised while driving the browser or talking to the search endpoint.
///
/// Missing selectors and missing fields are not errors: they degrade to
/// empty results or empty strings at the call site.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("browser error: {0}")]
    Browser(#[from] anyhow::Error),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("search frame not found ({frames} frames on page)")]
    FrameNotFound { frames: usize },

    #[error("timed out waiting for {what}")]
    Timeout { what: String },

    #[error("invalid selector \"{selector}\"")]
    Selector { selector: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("invalid value for {var}: {reason}")]
    Config { var: String, reason: String },
}

pub type Result<T> = std::result::Result<T, CrawlError>;
