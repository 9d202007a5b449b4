//! # API Server Module
//!
//! ## Purpose
//! REST API server exposing the search surface, the explicit corpus
//! listing, share-link entry and system health endpoints.
//!
//! ## Input/Output Specification
//! - **Input**: HTTP requests with search text, filter rules, share links
//! - **Output**: JSON responses with ranked results, health, statistics
//! - **Endpoints**: Search, shared search, documents, health, stats
//!
//! Malformed filter rules degrade to "no condition filter" and an
//! undecodable share link degrades to "no query"; neither is a server
//! error.

use crate::errors::SearchError;
use crate::query::{FilterRules, RawFilterRules};
use crate::search::SearchResult;
use crate::share;
use crate::utils::{TextUtils, Timer};
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use serde::{Deserialize, Serialize};

/// API server over the shared application state
pub struct ApiServer {
    app_state: crate::AppState,
}

/// Search request payload
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub filter_rules: Option<RawFilterRules>,
}

/// Share-link query parameter
#[derive(Debug, Deserialize)]
pub struct SharedSearchParams {
    pub s: Option<String>,
}

/// Search response payload
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub total_candidates: usize,
    pub degraded: bool,
    pub query_time_ms: u64,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl ApiServer {
    pub fn new(app_state: crate::AppState) -> Self {
        Self { app_state }
    }

    /// Run the API server until shutdown.
    pub async fn run(self) -> crate::Result<()> {
        let server_config = &self.app_state.config.server;
        let bind_addr = format!("{}:{}", server_config.host, server_config.port);
        let payload_limit = server_config.max_payload_size_mb as usize * 1024 * 1024;

        tracing::info!("Starting API server on {}", bind_addr);

        let app_state = self.app_state.clone();
        HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(app_state.clone()))
                .app_data(web::JsonConfig::default().limit(payload_limit))
                .route("/search", web::post().to(search_handler))
                .route("/search/shared", web::get().to(shared_search_handler))
                .route("/documents", web::get().to(documents_handler))
                .route("/health", web::get().to(health_handler))
                .route("/stats", web::get().to(stats_handler))
        })
        .client_request_timeout(std::time::Duration::from_secs(
            server_config.request_timeout_seconds,
        ))
        .bind(&bind_addr)
        .map_err(|e| SearchError::Internal {
            message: format!("Failed to bind server to {}: {}", bind_addr, e),
        })?
        .run()
        .await
        .map_err(|e| SearchError::Internal {
            message: format!("Server error: {}", e),
        })?;

        Ok(())
    }
}

/// Validate raw filter rules at the boundary. Malformed rules become "no
/// condition filter" with a warning rather than a failed request.
fn validated_rules(raw: Option<&RawFilterRules>) -> Option<FilterRules> {
    let raw = raw?;
    match FilterRules::from_raw(raw) {
        Ok(rules) => Some(rules),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed filter rules");
            None
        }
    }
}

async fn run_search(
    app_state: &crate::AppState,
    text: Option<&str>,
    rules: Option<FilterRules>,
) -> ActixResult<HttpResponse> {
    let timer = Timer::new("search_request");

    if let Some(text) = text {
        tracing::debug!(query = %TextUtils::truncate(text, 80), "Search request");
    }

    match app_state.engine.search(text, rules.as_ref()).await {
        Ok(outcome) => Ok(HttpResponse::Ok().json(SearchResponse {
            results: outcome.results,
            total_candidates: outcome.total_candidates,
            degraded: outcome.degraded,
            query_time_ms: timer.stop(),
        })),
        Err(e) => {
            tracing::error!(error = %e, category = e.category(), "Search failed");
            Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "error": e.category(),
                "message": e.to_string(),
            })))
        }
    }
}

/// Search endpoint handler
async fn search_handler(
    app_state: web::Data<crate::AppState>,
    request: web::Json<SearchRequest>,
) -> ActixResult<HttpResponse> {
    let rules = validated_rules(request.filter_rules.as_ref());
    run_search(&app_state, request.text.as_deref(), rules).await
}

/// Share-link entry point: decodes the `s` parameter into a search state.
/// An undecodable parameter runs as an empty query.
async fn shared_search_handler(
    app_state: web::Data<crate::AppState>,
    params: web::Query<SharedSearchParams>,
) -> ActixResult<HttpResponse> {
    let state = params
        .s
        .as_deref()
        .and_then(share::decode)
        .unwrap_or_default();

    let rules = validated_rules(state.filter_rules.as_ref());
    run_search(&app_state, state.text.as_deref(), rules).await
}

/// Explicit list-all endpoint; the search surface never returns the whole
/// corpus implicitly.
async fn documents_handler(app_state: web::Data<crate::AppState>) -> ActixResult<HttpResponse> {
    match app_state.engine.list_all().await {
        Ok(results) => Ok(HttpResponse::Ok().json(results)),
        Err(e) => {
            tracing::error!(error = %e, "Corpus listing failed");
            Ok(HttpResponse::InternalServerError().json(serde_json::json!({
                "error": e.category(),
                "message": e.to_string(),
            })))
        }
    }
}

/// Health check endpoint handler
async fn health_handler(app_state: web::Data<crate::AppState>) -> ActixResult<HttpResponse> {
    let healthy = app_state.engine.health_check().await.is_ok();
    let body = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    if healthy {
        Ok(HttpResponse::Ok().json(body))
    } else {
        Ok(HttpResponse::ServiceUnavailable().json(body))
    }
}

/// Statistics endpoint handler
async fn stats_handler(app_state: web::Data<crate::AppState>) -> ActixResult<HttpResponse> {
    match app_state.engine.stats().await {
        Ok(stats) => Ok(HttpResponse::Ok().json(stats)),
        Err(e) => {
            tracing::error!(error = %e, "Stats collection failed");
            Ok(HttpResponse::InternalServerError().json(serde_json::json!({
                "error": e.category(),
                "message": e.to_string(),
            })))
        }
    }
}
