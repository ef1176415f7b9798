//! REST API layer: pass-through handlers, DTOs, and router composition.
//!
//! Pass-through endpoints are mounted under `/api`; the health check and
//! OpenAPI document live at the root router.

pub mod dto;
pub mod handlers;
pub mod openapi;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api", handlers::routes())
        .merge(handlers::system::routes())
}
