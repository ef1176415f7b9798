//! System endpoints: health check and OpenAPI document.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::api::openapi::ApiDoc;
use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    backend_status: String,
    timestamp: String,
    version: String,
    ha_api_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    ha_response_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ha_response_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    supervisor_token_available: bool,
    ha_url_override: bool,
    ha_token_override: bool,
}

/// `GET /api/health` — Backend status plus an upstream reachability probe.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "System",
    summary = "Health check",
    description = "Probes the upstream API root and reports which credential source is configured.",
    responses(
        (status = 200, description = "Upstream probe completed", body = HealthResponse),
        (status = 500, description = "Upstream probe failed", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    tracing::debug!("health check requested");
    let probe = state.ha.probe().await;

    let (status, ha_response_status, ha_response_type, error) = match probe {
        Ok(probe) => (StatusCode::OK, Some(probe.status), Some(probe.content_type), None),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, None, None, Some(e.to_string())),
    };

    (
        status,
        Json(HealthResponse {
            backend_status: "running".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ha_api_url: format!("{}/", state.ha.base_url()),
            ha_response_status,
            ha_response_type,
            error,
            supervisor_token_available: state.config.upstream.is_supervised(),
            ha_url_override: state.config.ha_url_override,
            ha_token_override: state.config.ha_token_override,
        }),
    )
}

/// `GET /api-docs/openapi.json` — OpenAPI document for the REST surface.
pub async fn openapi_handler() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

/// System routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api-docs/openapi.json", get(openapi_handler))
}
