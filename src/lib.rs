//! # zone-gateway
//!
//! WebSocket relay and REST pass-through between a browser-based zone
//! configurator and Home Assistant.
//!
//! Each browser socket gets its own upstream session: the gateway
//! authenticates, subscribes to state changes, filters entity traffic down
//! to the entities the client cares about, and relays everything else
//! verbatim in both directions.
//!
//! ## Architecture
//!
//! ```text
//! Browser (HTTP, WebSocket)
//!     │
//!     ├── REST pass-through (api/) ──► HaClient (service/) ──► HA REST API
//!     │
//!     └── /ws ──► ProxySession (ws/connection)
//!                   ├── outbound queue ◄── UpstreamSession (ws/upstream) ◄── HA WebSocket
//!                   └── inbound queue  ──► InboundSender (ws/inbound)   ──► HA WebSocket
//!
//! EntityFilter + InterestSet (domain/) decide which entity frames pass.
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod ws;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// Builds the full application router: REST endpoints plus `/ws`.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
