//! Single-entity state pass-through.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::error::{ErrorResponse, GatewayError};

/// `GET /entities/{entity_id}` — Fetch one entity's state.
///
/// # Errors
///
/// Returns [`GatewayError`] when upstream is unreachable or does not know
/// the entity.
#[utoipa::path(
    get,
    path = "/api/entities/{entity_id}",
    tag = "Passthrough",
    summary = "Get entity state",
    params(
        ("entity_id" = String, Path, description = "Entity identifier, e.g. `sensor.office_target_1_x`"),
    ),
    responses(
        (status = 200, description = "Upstream state object"),
        (status = 400, description = "Missing or malformed entity_id", body = ErrorResponse),
        (status = 404, description = "Entity not found", body = ErrorResponse),
        (status = 502, description = "Upstream unreachable", body = ErrorResponse),
    )
)]
pub async fn get_entity_state(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    if entity_id.trim().is_empty() {
        return Err(GatewayError::InvalidRequest("Missing entity_id".to_string()));
    }
    let value = state.ha.entity_state(&entity_id).await?;
    Ok(Json(value))
}

/// Entity routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/entities/{entity_id}", get(get_entity_state))
}
