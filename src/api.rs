//! HTTP API: a single search endpoint in front of the browser crawler.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::CrawlerConfig;
use crate::crawler::crawl_single;
use crate::error::Result;
use crate::record::PlaceRecord;

pub const MAX_LIMIT: usize = 100;

pub type SearchFuture = Pin<Box<dyn Future<Output = Result<Vec<PlaceRecord>>> + Send>>;
/// `(query, limit)` to records. Production uses [`browser_search`].
pub type SearchFn = Arc<dyn Fn(String, usize) -> SearchFuture + Send + Sync>;

pub struct AppState {
    search: SearchFn,
    // One page interaction sequence at a time.
    crawl_lock: Mutex<()>,
}

impl AppState {
    pub fn new(search: SearchFn) -> Self {
        Self {
            search,
            crawl_lock: Mutex::new(()),
        }
    }
}

pub fn browser_search(config: CrawlerConfig) -> SearchFn {
    let config = Arc::new(config);
    Arc::new(move |query: String, limit: usize| -> SearchFuture {
        let config = Arc::clone(&config);
        Box::pin(async move { crawl_single(&config, &query, limit).await })
    })
}

fn default_limit() -> usize {
    10
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PlaceResult {
    pub name: String,
    pub rank: usize,
    pub raw_text: String,
}

impl From<PlaceRecord> for PlaceResult {
    fn from(record: PlaceRecord) -> Self {
        Self {
            name: record.name,
            rank: record.rank,
            raw_text: record.raw_text,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<PlaceResult>,
    pub total_count: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub message: String,
}

pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(ErrorResponse { error: self.1 })).into_response()
    }
}

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service is running", body = StatusResponse)),
    tag = "crawler"
)]
pub async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: "🗺️ place crawler API is running".to_string(),
    })
}

#[utoipa::path(
    post,
    path = "/search",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Places found for the query", body = SearchResponse),
        (status = 400, description = "Empty query", body = ErrorResponse),
        (status = 500, description = "Crawl failed", body = ErrorResponse)
    ),
    tag = "crawler"
)]
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> std::result::Result<Json<SearchResponse>, ApiError> {
    let query = req.query.trim().to_string();
    if query.is_empty() {
        return Err(ApiError(StatusCode::BAD_REQUEST, "query must not be empty".to_string()));
    }
    let limit = req.limit.clamp(1, MAX_LIMIT);
    info!("📋 search request: '{}' (up to {})", query, limit);

    let records = {
        let _guard = state.crawl_lock.lock().await;
        (state.search)(query.clone(), limit).await
    };

    match records {
        Ok(records) => {
            let results: Vec<PlaceResult> = records.into_iter().map(PlaceResult::from).collect();
            Ok(Json(SearchResponse {
                query,
                total_count: results.len(),
                results,
            }))
        }
        Err(e) => {
            error!("❌ search for '{}' failed: {}", query, e);
            Err(ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(root, search),
    components(schemas(SearchRequest, SearchResponse, PlaceResult, ErrorResponse, StatusResponse)),
    tags((name = "crawler", description = "Place search"))
)]
pub struct ApiDoc;

pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(root))
        .route("/search", post(search))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the API on `config.bind_addr` until Ctrl-C or SIGTERM.
pub async fn serve(config: CrawlerConfig) -> Result<()> {
    let bind_addr = config.bind_addr;
    let app = build_app(Arc::new(AppState::new(browser_search(config))));

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("🚀 API listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("received shutdown signal, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CrawlError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fake_search(records: Vec<PlaceRecord>) -> SearchFn {
        Arc::new(move |query: String, limit: usize| -> SearchFuture {
            let records: Vec<PlaceRecord> = records
                .iter()
                .take(limit)
                .cloned()
                .map(|mut r| {
                    r.search_query = query.clone();
                    r
                })
                .collect();
            Box::pin(async move { Ok(records) })
        })
    }

    async fn spawn_app(search: SearchFn) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = build_app(Arc::new(AppState::new(search)));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn place(rank: usize, name: &str) -> PlaceRecord {
        PlaceRecord {
            rank,
            name: name.to_string(),
            raw_text: format!("{name}서울 강남구"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_search_returns_names_ranks_and_raw_text() {
        let base = spawn_app(fake_search(vec![place(1, "스타벅스"), place(2, "커피빈"), place(3, "폴바셋")])).await;
        let resp = reqwest::Client::new()
            .post(format!("{base}/search"))
            .json(&serde_json::json!({"query": "강남 카페", "limit": 2}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let body: SearchResponse = resp.json().await.unwrap();
        assert_eq!(body.query, "강남 카페");
        assert_eq!(body.total_count, 2);
        assert_eq!(body.results[1].name, "커피빈");
        assert_eq!(body.results[1].rank, 2);
        assert_eq!(body.results[0].raw_text, "스타벅스서울 강남구");
    }

    #[tokio::test]
    async fn test_limit_defaults_to_ten() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in_fn = Arc::clone(&seen);
        let search: SearchFn = Arc::new(move |_q: String, limit: usize| -> SearchFuture {
            seen_in_fn.store(limit, Ordering::SeqCst);
            Box::pin(async { Ok(Vec::new()) })
        });
        let base = spawn_app(search).await;
        let resp = reqwest::Client::new()
            .post(format!("{base}/search"))
            .json(&serde_json::json!({"query": "맛집"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(seen.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_crawl_failure_is_500_with_error_body() {
        let search: SearchFn = Arc::new(|_q: String, _limit: usize| -> SearchFuture {
            Box::pin(async { Err(CrawlError::FrameNotFound { frames: 0 }) })
        });
        let base = spawn_app(search).await;
        let resp = reqwest::Client::new()
            .post(format!("{base}/search"))
            .json(&serde_json::json!({"query": "맛집", "limit": 5}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 500);
        let body: ErrorResponse = resp.json().await.unwrap();
        assert!(body.error.contains("search frame not found"));
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let base = spawn_app(fake_search(Vec::new())).await;
        let resp = reqwest::Client::new()
            .post(format!("{base}/search"))
            .json(&serde_json::json!({"query": "   "}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
    }

    #[tokio::test]
    async fn test_root_and_openapi_are_served() {
        let base = spawn_app(fake_search(Vec::new())).await;
        let root: StatusResponse = reqwest::get(format!("{base}/")).await.unwrap().json().await.unwrap();
        assert!(root.message.contains("running"));

        let openapi: serde_json::Value = reqwest::get(format!("{base}/api-docs/openapi.json"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(openapi["paths"]["/search"].is_object());
    }
}
