//! HTTP API server.
//!
//! Exposes the trend engine over JSON HTTP. This layer owns boundary
//! validation (non-empty keyword, result limit clamped to [1, 100]) and
//! the mapping of engine failures to one generic error response — partial
//! or degraded responses are never surfaced as errors.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/search` | Run a trend search |
//! | `GET`  | `/platforms` | Adapter availability report |
//! | `GET`  | `/history` | Recent trend queries |
//! | `GET`  | `/trending` | Most-queried keywords in a window |
//! | `GET`  | `/health` | Health check |
//!
//! # Error contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "keyword must not be empty" } }
//! ```

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::models::{Timeframe, TrendQuery, TrendSearchRequest, TrendSearchResponse, MAX_LIMIT};
use crate::search::TrendEngine;
use crate::store;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    engine: Arc<TrendEngine>,
    pool: SqlitePool,
}

/// Start the HTTP server on the configured bind address. Runs until the
/// process is terminated.
pub async fn run_server(
    config: &Config,
    engine: Arc<TrendEngine>,
    pool: SqlitePool,
) -> anyhow::Result<()> {
    let state = AppState { engine, pool };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/search", post(handle_search))
        .route("/platforms", get(handle_platforms))
        .route("/history", get(handle_history))
        .route("/trending", get(handle_trending))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    tracing::info!(bind = %config.server.bind, "trend API listening");

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

/// Unexpected orchestration failure: one generic error, no partial body.
fn internal(err: anyhow::Error) -> AppError {
    tracing::error!(error = %err, "search failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: "trend search failed".to_string(),
    }
}

// ============ POST /search ============

async fn handle_search(
    State(state): State<AppState>,
    Json(mut req): Json<TrendSearchRequest>,
) -> Result<Json<TrendSearchResponse>, AppError> {
    if req.keyword.trim().is_empty() {
        return Err(bad_request("keyword must not be empty"));
    }
    // Boundary-validated limit; the engine trusts this
    req.limit = Some(req.limit.unwrap_or(crate::models::DEFAULT_LIMIT).clamp(1, MAX_LIMIT));

    let response = state.engine.search(&req).await.map_err(internal)?;
    Ok(Json(response))
}

// ============ GET /platforms ============

#[derive(Serialize)]
struct PlatformStatus {
    platform: String,
    available: bool,
}

#[derive(Serialize)]
struct PlatformsResponse {
    platforms: Vec<PlatformStatus>,
}

async fn handle_platforms(State(state): State<AppState>) -> Json<PlatformsResponse> {
    let platforms = state
        .engine
        .registry()
        .adapters()
        .iter()
        .map(|a| PlatformStatus {
            platform: a.platform().to_string(),
            available: a.is_available(),
        })
        .collect();
    Json(PlatformsResponse { platforms })
}

// ============ GET /history ============

#[derive(Deserialize)]
struct HistoryParams {
    requester: Option<String>,
    limit: Option<usize>,
}

#[derive(Serialize)]
struct HistoryResponse {
    queries: Vec<TrendQuery>,
}

async fn handle_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, AppError> {
    let limit = params.limit.unwrap_or(20).clamp(1, MAX_LIMIT);
    let queries = store::trend_history(&state.pool, params.requester.as_deref(), limit)
        .await
        .map_err(internal)?;
    Ok(Json(HistoryResponse { queries }))
}

// ============ GET /trending ============

#[derive(Deserialize)]
struct TrendingParams {
    window: Option<String>,
    limit: Option<usize>,
}

#[derive(Serialize)]
struct TrendingKeyword {
    keyword: String,
    query_count: i64,
}

#[derive(Serialize)]
struct TrendingResponse {
    window: String,
    keywords: Vec<TrendingKeyword>,
}

/// Map a timeframe token to a lookback duration for the trending window.
/// `all` (or unrecognized) means effectively unbounded.
pub(crate) fn window_duration(timeframe: Timeframe) -> Duration {
    match timeframe {
        Timeframe::Hour => Duration::hours(1),
        Timeframe::Day => Duration::hours(24),
        Timeframe::Week => Duration::days(7),
        Timeframe::Month => Duration::days(30),
        Timeframe::Year => Duration::days(365),
        Timeframe::All => Duration::days(3650),
    }
}

async fn handle_trending(
    State(state): State<AppState>,
    Query(params): Query<TrendingParams>,
) -> Result<Json<TrendingResponse>, AppError> {
    let timeframe = Timeframe::parse(params.window.as_deref().unwrap_or("24h"));
    let limit = params.limit.unwrap_or(10).clamp(1, MAX_LIMIT);

    let keywords = store::top_keywords_in_window(&state.pool, window_duration(timeframe), limit)
        .await
        .map_err(internal)?
        .into_iter()
        .map(|(keyword, query_count)| TrendingKeyword {
            keyword,
            query_count,
        })
        .collect();

    Ok(Json(TrendingResponse {
        window: timeframe.as_token().to_string(),
        keywords,
    }))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_duration_tokens() {
        assert_eq!(window_duration(Timeframe::Day), Duration::hours(24));
        assert_eq!(window_duration(Timeframe::Week), Duration::days(7));
        assert!(window_duration(Timeframe::All) > Duration::days(365));
    }
}
