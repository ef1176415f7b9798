//! Template rendering pass-through.

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::TemplateRequest;
use crate::app_state::AppState;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /template` — Render a template upstream.
///
/// The upstream body and content type are relayed unchanged.
///
/// # Errors
///
/// Returns [`GatewayError`] when the template is missing or upstream fails.
#[utoipa::path(
    post,
    path = "/api/template",
    tag = "Passthrough",
    summary = "Render a template",
    request_body = TemplateRequest,
    responses(
        (status = 200, description = "Rendered template, relayed verbatim"),
        (status = 400, description = "No template provided", body = ErrorResponse),
        (status = 502, description = "Upstream unreachable", body = ErrorResponse),
        (status = 504, description = "Upstream timed out", body = ErrorResponse),
    )
)]
pub async fn render_template(
    State(state): State<AppState>,
    Json(req): Json<TemplateRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let template = req.into_template()?;
    let rendered = state.ha.render_template(&template).await?;
    let status = StatusCode::from_u16(rendered.status).unwrap_or(StatusCode::OK);

    Ok((
        status,
        [(header::CONTENT_TYPE, rendered.content_type)],
        rendered.body,
    ))
}

/// Template routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/template", post(render_template))
}
