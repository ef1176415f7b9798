//! REST endpoint handlers organized by resource.

pub mod entities;
pub mod services;
pub mod system;
pub mod template;

use axum::Router;

use crate::app_state::AppState;

/// Composes all pass-through routes under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(template::routes())
        .merge(entities::routes())
        .merge(services::routes())
}
