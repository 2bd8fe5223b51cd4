//! HTTP surface.
//!
//! Thin axum layer over [`DefaultService`]. Errors are returned as
//! `{"detail": "..."}` with a status chosen by [`ApiError`].

use crate::error::PipelineError;
use crate::paper::{PaperRecord, SearchParameters, DEFAULT_MAX_RESULTS};
use crate::service::{DefaultService, TranslationOutcome};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

type AppState = Arc<DefaultService>;

/// Build the application router.
pub fn router(service: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/api/papers", get(search_handler))
        .route("/api/papers/search-natural", post(search_natural_handler))
        // Path used by the existing web frontend
        .route("/api/papers/search-with-gemini", post(search_natural_handler))
        .route("/api/papers/translate", post(translate_handler))
        .route("/api/papers/summarize", post(summarize_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(service)
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, service: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "HTTP server listening");
    }
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Error response: `{"detail": "..."}`
#[derive(Debug)]
pub struct ApiError(PipelineError);

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        ApiError(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self.0 {
            PipelineError::Feed(_) => (
                StatusCode::BAD_GATEWAY,
                format!("Paper search failed: the arXiv API returned an unreadable feed ({})", self.0),
            ),
            PipelineError::NotConfigured(_) => (StatusCode::SERVICE_UNAVAILABLE, self.0.to_string()),
            PipelineError::Validation(_) => (StatusCode::BAD_REQUEST, self.0.to_string()),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, format!("Request failed: {}", self.0)),
        };
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self.0, "Request failed");
        }
        (status, Json(ErrorBody { detail })).into_response()
    }
}

#[derive(Serialize)]
struct WelcomeResponse {
    message: &'static str,
}

async fn root_handler() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to the paper search and translation API",
    })
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

/// Query string of `GET /api/papers`
#[derive(Debug, Deserialize)]
struct SearchQuery {
    keyword: Option<String>,
    genre: Option<String>,
    year_from: Option<i32>,
    year_to: Option<i32>,
    #[serde(default = "default_max_results")]
    max_results: usize,
    #[serde(default = "default_translate")]
    translate: bool,
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

fn default_translate() -> bool {
    true
}

async fn search_handler(
    State(service): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<PaperRecord>>, ApiError> {
    info!(keyword = ?query.keyword, genre = ?query.genre, translate = query.translate, "Search request");

    let params = SearchParameters {
        keyword: query.keyword,
        category: query.genre,
        year_from: query.year_from,
        year_to: query.year_to,
        max_results: query.max_results,
    };
    let records = service.search(&params, query.translate).await?;
    Ok(Json(records))
}

/// Body of `POST /api/papers/search-natural`: the free text travels in
/// `keyword`, the other fields are used when refinement leaves them out.
async fn search_natural_handler(
    State(service): State<AppState>,
    Json(request): Json<SearchParameters>,
) -> Result<Json<Vec<PaperRecord>>, ApiError> {
    let free_text = request.keyword.as_deref().map(str::trim).unwrap_or_default();
    if free_text.is_empty() {
        return Err(PipelineError::Validation("keyword must not be empty".to_string()).into());
    }
    info!(text = %free_text, "Natural-language search request");

    let records = service.search_natural(free_text, &request).await?;
    Ok(Json(records))
}

#[derive(Debug, Deserialize)]
struct TextQuery {
    paper_id: String,
    text: String,
}

async fn translate_handler(
    State(service): State<AppState>,
    Query(query): Query<TextQuery>,
) -> Json<TranslationOutcome> {
    info!(paper_id = %query.paper_id, chars = query.text.chars().count(), "Translate request");
    Json(service.translate_text(&query.text).await)
}

#[derive(Serialize)]
struct SummaryResponse {
    summary: String,
    success: bool,
}

async fn summarize_handler(
    State(service): State<AppState>,
    Query(query): Query<TextQuery>,
) -> Result<Json<SummaryResponse>, ApiError> {
    info!(paper_id = %query.paper_id, chars = query.text.chars().count(), "Summarize request");
    let summary = service.summarize_text(&query.text).await?;
    Ok(Json(SummaryResponse {
        summary,
        success: true,
    }))
}
