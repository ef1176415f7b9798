//! Shared DTO types used across multiple endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::GatewayError;

/// Plain acknowledgement returned by service endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    /// Human-readable outcome.
    pub message: String,
}

/// Returns the trimmed value or an [`GatewayError::InvalidRequest`] naming
/// what is missing.
pub(crate) fn required(value: Option<String>, what: &str) -> Result<String, GatewayError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| GatewayError::InvalidRequest(format!("Missing {what}")))
}
