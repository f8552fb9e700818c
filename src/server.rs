//! JSON HTTP API over the search aggregator.
//!
//! ## Endpoints
//!
//! - `GET /health`: liveness and service name
//! - `GET /api/search`: aggregated local + NASA API search
//! - `GET /api/search/csv`: local dataset search only
//! - `GET /api/search/csv/stats`: loaded dataset statistics
//! - `GET /api/search/nasa`: NASA API search only, no local data
//! - `GET /api/search/nasa/test`: connectivity check for each NASA API
//! - `POST /api/graph/derive`: knowledge-graph summary for one result
//!
//! When an API key is configured, every `/api/*` route requires a matching
//! `x-api-key` header.

use axum::Router;
use axum::extract::{Query, Request, State};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tracing::{Instrument, info};
use uuid::Uuid;

use astrobio_search::{
    CheckStatus, CsvSource, DatasetStats, KnowledgeGraph, SearchAggregator, SearchError,
    SourceCheck, derive_graph,
};

use crate::config::{AppConfig, ServerConfig};
use crate::error::{AppError, Result};

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/search`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    /// Free-text query. Missing or blank returns no results.
    #[serde(default)]
    pub query: String,
    /// Maximum results; clamped into `1..=max_limit`.
    pub limit: Option<usize>,
    /// Include NASA API sources (default `true`).
    pub include_nasa_apis: Option<bool>,
}

/// Request body for `POST /api/graph/derive`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphRequest {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub title: String,
}

/// Response from `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    /// RFC 3339 timestamp.
    pub timestamp: String,
}

/// Response from `GET /api/search/nasa/test`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityResponse {
    /// Always `"completed"`; per-source outcomes are in `sources`.
    pub status: String,
    pub sources: Vec<SourceCheck>,
    /// RFC 3339 timestamp.
    pub timestamp: String,
}

/// Error response body: `{"error": {"message": ..., "type": ...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// The error details.
    pub error: ErrorBody,
}

/// Error details within an [`ErrorResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable error message.
    pub message: String,
    /// Error type (e.g. `"service_unavailable"`, `"authentication_error"`).
    #[serde(rename = "type")]
    pub error_type: String,
}

fn error_response(status: StatusCode, message: impl Into<String>, error_type: &str) -> Response {
    let body = ErrorResponse {
        error: ErrorBody {
            message: message.into(),
            error_type: error_type.to_owned(),
        },
    };
    (status, Json(body)).into_response()
}

fn search_error_response(err: &SearchError) -> Response {
    match err {
        SearchError::LocalSourceFailure(_) => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, err.to_string(), "service_unavailable")
        }
        SearchError::Config(_) => {
            error_response(StatusCode::BAD_REQUEST, err.to_string(), "invalid_request_error")
        }
        SearchError::Http(_) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string(), "server_error")
        }
    }
}

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

/// Shared state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    aggregator: Arc<SearchAggregator>,
    local: Arc<CsvSource>,
    service_name: String,
    api_key: Option<Arc<str>>,
}

impl AppState {
    /// Assemble state from an aggregator and the local source it wraps.
    pub fn new(aggregator: Arc<SearchAggregator>, local: Arc<CsvSource>, server: &ServerConfig) -> Self {
        Self {
            aggregator,
            local,
            service_name: server.service_name.clone(),
            api_key: server.api_key.as_deref().map(Arc::from),
        }
    }

    /// Load the local datasets and build the aggregator described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the search configuration is invalid or the HTTP
    /// client cannot be built. Missing datasets are not an error.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let local = Arc::new(CsvSource::load(&config.local.datasets, config.search.local_timeout_ms).await);
        let aggregator =
            astrobio_search::build_aggregator(&config.search, &config.sources, local.clone())?;
        Ok(Self::new(Arc::new(aggregator), local, &config.server))
    }

    fn clamp_limit(&self, limit: Option<usize>) -> usize {
        let config = self.aggregator.config();
        limit.unwrap_or(config.default_limit).clamp(1, config.max_limit)
    }
}

/// Build the router with all routes, API-key guard and CORS.
pub fn router(state: AppState, server: &ServerConfig) -> Router {
    let api = Router::new()
        .route("/search", get(handle_search))
        .route("/search/csv", get(handle_search_local))
        .route("/search/csv/stats", get(handle_stats))
        .route("/search/nasa", get(handle_search_external))
        .route("/search/nasa/test", get(handle_check_sources))
        .route("/graph/derive", post(handle_graph))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/health", get(handle_health))
        .nest("/api", api)
        .layer(cors_layer(&server.cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(API_KEY_HEADER),
        ])
        .allow_credentials(true)
}

// ---------------------------------------------------------------------------
// SearchServer
// ---------------------------------------------------------------------------

/// The HTTP server, serving in a background tokio task.
pub struct SearchServer {
    /// The address the server is listening on.
    addr: SocketAddr,
    /// Handle to the background server task.
    handle: JoinHandle<()>,
}

impl SearchServer {
    /// Start the server.
    ///
    /// Binds to `{config.host}:{config.port}` (use port `0` for auto-assign)
    /// and begins serving in a background tokio task.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot bind.
    pub async fn start(state: AppState, config: &ServerConfig) -> Result<Self> {
        let app = router(state, config);

        let bind_addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| AppError::Server(format!("bind to {bind_addr} failed: {e}")))?;

        let addr = listener
            .local_addr()
            .map_err(|e| AppError::Server(format!("failed to get local addr: {e}")))?;

        info!("search API listening on http://{addr}");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("search server error: {e}");
            }
        });

        Ok(Self { addr, handle })
    }

    /// Returns the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Abort the server task.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for SearchServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(expected) = &state.api_key {
        let provided = request
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_ref()) {
            tracing::warn!(path = %request.uri().path(), "rejected request with missing or invalid API key");
            return error_response(StatusCode::UNAUTHORIZED, "invalid or missing API key", "authentication_error");
        }
    }
    next.run(request).await
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// `GET /health`
async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_owned(),
        service: state.service_name,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `GET /api/search`
async fn handle_search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    let request_id = Uuid::new_v4();
    let limit = state.clamp_limit(params.limit);
    let include_external = params.include_nasa_apis.unwrap_or(true);
    let span = tracing::info_span!("search", %request_id, limit, include_external);

    async move {
        match state.aggregator.search(&params.query, limit, include_external).await {
            Ok(response) => {
                info!(
                    count = response.count,
                    failed_sources = response.errors.len(),
                    cached = response.cached,
                    "search complete"
                );
                Json(response).into_response()
            }
            Err(e) => {
                tracing::error!(error = %e, "search failed");
                search_error_response(&e)
            }
        }
    }
    .instrument(span)
    .await
}

/// `GET /api/search/csv`
async fn handle_search_local(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    let request_id = Uuid::new_v4();
    let limit = state.clamp_limit(params.limit);
    let span = tracing::info_span!("search_local", %request_id, limit);

    async move {
        match state.aggregator.search_local(&params.query, limit).await {
            Ok(response) => {
                info!(count = response.count, "local search complete");
                Json(response).into_response()
            }
            Err(e) => {
                tracing::error!(error = %e, "local search failed");
                search_error_response(&e)
            }
        }
    }
    .instrument(span)
    .await
}

/// `GET /api/search/nasa`
async fn handle_search_external(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    let request_id = Uuid::new_v4();
    let limit = state.clamp_limit(params.limit);
    let span = tracing::info_span!("search_external", %request_id, limit);

    async move {
        match state.aggregator.search_external(&params.query, limit).await {
            Ok(response) => {
                info!(
                    count = response.count,
                    failed_sources = response.errors.len(),
                    "external search complete"
                );
                Json(response).into_response()
            }
            Err(e) => {
                tracing::error!(error = %e, "external search failed");
                search_error_response(&e)
            }
        }
    }
    .instrument(span)
    .await
}

/// `GET /api/search/nasa/test`
async fn handle_check_sources(State(state): State<AppState>) -> Json<ConnectivityResponse> {
    let sources = state.aggregator.check_sources().await;
    info!(
        checked = sources.len(),
        failed = sources.iter().filter(|c| c.status == CheckStatus::Error).count(),
        "connectivity check complete"
    );
    Json(ConnectivityResponse {
        status: "completed".to_owned(),
        sources,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `GET /api/search/csv/stats`
async fn handle_stats(State(state): State<AppState>) -> Json<DatasetStats> {
    Json(state.local.stats())
}

/// `POST /api/graph/derive`
async fn handle_graph(Json(request): Json<GraphRequest>) -> Json<KnowledgeGraph> {
    Json(derive_graph(&request.tags, &request.title))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use astrobio_search::SourceError;

    #[test]
    fn error_body_uses_type_key() {
        let body = ErrorResponse {
            error: ErrorBody {
                message: "boom".into(),
                error_type: "server_error".into(),
            },
        };
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(json["error"]["type"], "server_error");
        assert_eq!(json["error"]["message"], "boom");
    }

    #[test]
    fn local_failure_maps_to_503() {
        let err = SearchError::LocalSourceFailure(SourceError::Timeout("Local Database exceeded 2000ms".into()));
        assert_eq!(search_error_response(&err).status(), StatusCode::SERVICE_UNAVAILABLE);
        let err = SearchError::Config("limit must be between 1 and 100".into());
        assert_eq!(search_error_response(&err).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn search_params_default_to_empty_query() {
        let params: SearchParams = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(params.query.is_empty());
        assert!(params.limit.is_none());
        assert!(params.include_nasa_apis.is_none());
    }
}
