//! nullindex-api — HTTP search over stored null-data payloads.
//!
//! Routes:
//! - `GET /opreturn/:data` — records whose payload contains `data`
//!   (optional `?limit=`, capped at [`ApiConfig::max_limit`])
//! - `GET /health`
//!
//! The fragment is always handed to the store as a bound parameter.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use nullindex_core::{IndexerError, NullDataRecord, RecordSearch};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Search API settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind: SocketAddr,
    /// Results returned when the request does not ask for a limit.
    pub default_limit: u32,
    /// Upper bound on `?limit=`.
    pub max_limit: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            default_limit: 100,
            max_limit: 1_000,
        }
    }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

/// One hit, in the response's camelCase shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpReturnHit {
    pub data: String,
    pub height: u64,
    pub block_hash: String,
    #[serde(rename = "txId")]
    pub tx_id: String,
}

impl From<NullDataRecord> for OpReturnHit {
    fn from(r: NullDataRecord) -> Self {
        Self {
            data: r.data,
            height: r.height,
            block_hash: r.block_hash,
            tx_id: r.tx_hash,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub op_returns: Vec<OpReturnHit>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    limit: Option<u32>,
}

/// A store failure surfaced to the client as `500`.
struct ApiError(IndexerError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "search failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "search failed" })),
        )
            .into_response()
    }
}

// ─── Router ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct AppState {
    search: Arc<dyn RecordSearch>,
    default_limit: u32,
    max_limit: u32,
}

/// Build the search router over `search`.
pub fn router(search: Arc<dyn RecordSearch>, config: &ApiConfig) -> Router {
    let state = AppState {
        search,
        default_limit: config.default_limit,
        max_limit: config.max_limit,
    };

    Router::new()
        .route("/opreturn/:data", get(search_op_returns))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn search_op_returns(
    State(state): State<AppState>,
    Path(data): Path<String>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let limit = params
        .limit
        .unwrap_or(state.default_limit)
        .clamp(1, state.max_limit);

    let records = state.search.search(&data, limit).await.map_err(ApiError)?;

    Ok(Json(SearchResponse {
        query: data,
        op_returns: records.into_iter().map(OpReturnHit::from).collect(),
    }))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ─── Server ──────────────────────────────────────────────────────────────────

/// Bind `config.bind` and serve until `shutdown` resolves.
pub async fn serve(
    search: Arc<dyn RecordSearch>,
    config: ApiConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let app = router(search, &config);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!(addr = %listener.local_addr()?, "Search API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
