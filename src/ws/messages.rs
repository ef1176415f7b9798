//! Messages the gateway itself sends to the browser client.
//!
//! Everything else the client receives is upstream traffic relayed as-is.

use serde::Serialize;

use crate::domain::Frame;

/// Locally generated client-bound message.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientNotice {
    /// Reply to a client `ping`.
    Pong,
    /// Acknowledges `set_selected_entities`.
    EntitiesUpdated {
        /// Size of the new interest set.
        count: usize,
    },
    /// Upstream authenticated and subscribed.
    Connected {
        /// Human-readable status.
        message: String,
    },
    /// Upstream socket closed.
    ConnectionClosed {
        /// Human-readable status.
        message: String,
    },
    /// Terminal or per-request failure.
    Error {
        /// Human-readable reason.
        message: String,
    },
}

impl ClientNotice {
    /// `connected` notice sent after the subscription is in place.
    #[must_use]
    pub fn connected() -> Self {
        Self::Connected {
            message: "Connected to Home Assistant".to_string(),
        }
    }

    /// `connection_closed` notice sent when upstream goes away.
    #[must_use]
    pub fn upstream_closed() -> Self {
        Self::ConnectionClosed {
            message: "Home Assistant WebSocket closed".to_string(),
        }
    }

    /// `error` notice.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Serializes to the wire text.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Serializes to a relay [`Frame`].
    #[must_use]
    pub fn to_frame(&self) -> Frame {
        Frame::from_value(serde_json::to_value(self).unwrap_or_default())
    }
}
