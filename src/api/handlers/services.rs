//! Service-call pass-through: number, switch, select and light.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{EntityRequest, MessageResponse, NumberSetValueRequest, SelectOptionRequest};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, GatewayError};
use crate::service::ServiceCall;

async fn invoke(state: &AppState, call: ServiceCall) -> Result<Json<MessageResponse>, GatewayError> {
    let message = state.ha.call_service(&call).await?;
    Ok(Json(MessageResponse { message }))
}

/// `POST /services/number/set_value`
///
/// # Errors
///
/// Returns [`GatewayError`] on missing fields or upstream failure.
#[utoipa::path(
    post,
    path = "/api/services/number/set_value",
    tag = "Services",
    request_body = NumberSetValueRequest,
    responses(
        (status = 200, description = "Value set", body = MessageResponse),
        (status = 400, description = "Missing entity_id or value", body = ErrorResponse),
    )
)]
pub async fn number_set_value(
    State(state): State<AppState>,
    Json(req): Json<NumberSetValueRequest>,
) -> Result<Json<MessageResponse>, GatewayError> {
    invoke(&state, ServiceCall::try_from(req)?).await
}

/// `POST /services/switch/turn_on`
///
/// # Errors
///
/// Returns [`GatewayError`] on missing fields or upstream failure.
#[utoipa::path(
    post,
    path = "/api/services/switch/turn_on",
    tag = "Services",
    request_body = EntityRequest,
    responses(
        (status = 200, description = "Switch turned on", body = MessageResponse),
        (status = 400, description = "Missing entity_id", body = ErrorResponse),
    )
)]
pub async fn switch_turn_on(
    State(state): State<AppState>,
    Json(req): Json<EntityRequest>,
) -> Result<Json<MessageResponse>, GatewayError> {
    let entity_id = req.entity_id()?;
    invoke(&state, ServiceCall::SwitchTurnOn { entity_id }).await
}

/// `POST /services/switch/turn_off`
///
/// # Errors
///
/// Returns [`GatewayError`] on missing fields or upstream failure.
#[utoipa::path(
    post,
    path = "/api/services/switch/turn_off",
    tag = "Services",
    request_body = EntityRequest,
    responses(
        (status = 200, description = "Switch turned off", body = MessageResponse),
        (status = 400, description = "Missing entity_id", body = ErrorResponse),
    )
)]
pub async fn switch_turn_off(
    State(state): State<AppState>,
    Json(req): Json<EntityRequest>,
) -> Result<Json<MessageResponse>, GatewayError> {
    let entity_id = req.entity_id()?;
    invoke(&state, ServiceCall::SwitchTurnOff { entity_id }).await
}

/// `POST /services/select/select_option`
///
/// # Errors
///
/// Returns [`GatewayError`] on missing fields or upstream failure.
#[utoipa::path(
    post,
    path = "/api/services/select/select_option",
    tag = "Services",
    request_body = SelectOptionRequest,
    responses(
        (status = 200, description = "Option selected", body = MessageResponse),
        (status = 400, description = "Missing entity_id or option", body = ErrorResponse),
    )
)]
pub async fn select_option(
    State(state): State<AppState>,
    Json(req): Json<SelectOptionRequest>,
) -> Result<Json<MessageResponse>, GatewayError> {
    invoke(&state, ServiceCall::try_from(req)?).await
}

/// `POST /services/light/turn_on`
///
/// # Errors
///
/// Returns [`GatewayError`] on missing fields or upstream failure.
#[utoipa::path(
    post,
    path = "/api/services/light/turn_on",
    tag = "Services",
    request_body = EntityRequest,
    responses(
        (status = 200, description = "Light turned on", body = MessageResponse),
        (status = 400, description = "Missing entity_id", body = ErrorResponse),
    )
)]
pub async fn light_turn_on(
    State(state): State<AppState>,
    Json(req): Json<EntityRequest>,
) -> Result<Json<MessageResponse>, GatewayError> {
    let entity_id = req.entity_id()?;
    invoke(&state, ServiceCall::LightTurnOn { entity_id }).await
}

/// `POST /services/light/turn_off`
///
/// # Errors
///
/// Returns [`GatewayError`] on missing fields or upstream failure.
#[utoipa::path(
    post,
    path = "/api/services/light/turn_off",
    tag = "Services",
    request_body = EntityRequest,
    responses(
        (status = 200, description = "Light turned off", body = MessageResponse),
        (status = 400, description = "Missing entity_id", body = ErrorResponse),
    )
)]
pub async fn light_turn_off(
    State(state): State<AppState>,
    Json(req): Json<EntityRequest>,
) -> Result<Json<MessageResponse>, GatewayError> {
    let entity_id = req.entity_id()?;
    invoke(&state, ServiceCall::LightTurnOff { entity_id }).await
}

/// Service routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/services/number/set_value", post(number_set_value))
        .route("/services/switch/turn_on", post(switch_turn_on))
        .route("/services/switch/turn_off", post(switch_turn_off))
        .route("/services/select/select_option", post(select_option))
        .route("/services/light/turn_on", post(light_turn_on))
        .route("/services/light/turn_off", post(light_turn_off))
}
