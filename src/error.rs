//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//! Errors raised inside a proxy session never cross task boundaries; they are
//! logged where they occur and only the session phase is propagated.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tokio_tungstenite::tungstenite::Error as WsError;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 5002,
///     "message": "upstream returned 401",
///     "details": "401: Unauthorized"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`GatewayError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category          | HTTP Status                  |
/// |-----------|-------------------|------------------------------|
/// | 1000–1999 | Validation        | 400 Bad Request              |
/// | 2000–2999 | Configuration     | 500 Internal Server Error    |
/// | 3000–3999 | Server            | 500 Internal Server Error    |
/// | 4000–4999 | Upstream WebSocket| 502 / 504                    |
/// | 5000–5999 | Upstream HTTP     | 502 / 504 / relayed status   |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Request validation failed.
    #[error("{0}")]
    InvalidRequest(String),

    /// A frame was not a JSON object or lacked a required field.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// No usable upstream credentials or an unparsable setting.
    #[error("configuration error: {0}")]
    Config(String),

    /// The upstream platform rejected the access token.
    #[error("upstream authentication rejected{}", .0.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    AuthInvalid(Option<String>),

    /// The upstream socket is not connected or not yet authenticated.
    #[error("upstream not ready")]
    NotReady,

    /// Transport failure on the upstream WebSocket.
    #[error("upstream websocket error: {0}")]
    WebSocket(#[from] WsError),

    /// A write to the upstream WebSocket did not finish in time.
    #[error("upstream websocket write timed out")]
    WriteTimeout,

    /// The upstream HTTP API could not be reached.
    #[error("cannot connect to Home Assistant API: {0}")]
    UpstreamUnavailable(String),

    /// The upstream HTTP API did not answer in time.
    #[error("timeout connecting to Home Assistant API: {0}")]
    UpstreamTimeout(String),

    /// The upstream HTTP API answered with a non-success status.
    #[error("{message}")]
    UpstreamStatus {
        /// Status code returned by the upstream API.
        status: u16,
        /// Operation-specific summary.
        message: String,
        /// Upstream response body, possibly truncated.
        details: String,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::MalformedFrame(_) => 1002,
            Self::Config(_) => 2001,
            Self::Internal(_) => 3000,
            Self::AuthInvalid(_) => 4001,
            Self::NotReady => 4002,
            Self::WebSocket(_) => 4003,
            Self::WriteTimeout => 4004,
            Self::UpstreamUnavailable(_) => 5001,
            Self::UpstreamStatus { .. } => 5002,
            Self::UpstreamTimeout(_) => 5003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::MalformedFrame(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::AuthInvalid(_) | Self::NotReady | Self::WebSocket(_) => StatusCode::BAD_GATEWAY,
            Self::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::UpstreamTimeout(_) | Self::WriteTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::UpstreamStatus { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            Self::UpstreamStatus { details, .. } => Some(details.clone()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::UpstreamTimeout(err.to_string())
        } else if err.is_connect() || err.is_request() {
            Self::UpstreamUnavailable(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: self.details(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
