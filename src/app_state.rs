//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::service::HaClient;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Immutable gateway configuration; each proxy session reads its
    /// upstream credentials and timing from here.
    pub config: Arc<GatewayConfig>,
    /// REST client for the pass-through endpoints.
    pub ha: Arc<HaClient>,
}

impl AppState {
    /// Builds the state from a loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::GatewayError::Internal`] if the HTTP client
    /// cannot be constructed.
    pub fn new(config: GatewayConfig) -> Result<Self, crate::error::GatewayError> {
        let ha = HaClient::new(&config.upstream, config.http_timeout)?;
        Ok(Self {
            config: Arc::new(config),
            ha: Arc::new(ha),
        })
    }
}
