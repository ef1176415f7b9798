//! Parsed WebSocket frames.
//!
//! A [`Frame`] keeps the exact text it was received as next to its parsed
//! JSON object, so verbatim relays never re-serialize. Frames are never
//! mutated; filtering a bulk result produces a new frame.

use serde_json::{Map, Value};

use crate::error::GatewayError;

/// One JSON-object text frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    text: String,
    value: Map<String, Value>,
}

impl Frame {
    /// Parses a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MalformedFrame`] if `text` is not valid JSON
    /// or not a JSON object.
    pub fn parse(text: impl Into<String>) -> Result<Self, GatewayError> {
        let text = text.into();
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(value)) => Ok(Self { text, value }),
            Ok(_) => Err(GatewayError::MalformedFrame(
                "frame is not a JSON object".to_string(),
            )),
            Err(e) => Err(GatewayError::MalformedFrame(e.to_string())),
        }
    }

    /// Builds a frame from a JSON object, serializing it once.
    #[must_use]
    pub fn from_object(value: Map<String, Value>) -> Self {
        let text = Value::Object(value.clone()).to_string();
        Self { text, value }
    }

    /// Builds a frame from any JSON value; non-objects are wrapped as
    /// `{"value": ...}` so the invariant holds.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::from_object(map),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                Self::from_object(map)
            }
        }
    }

    /// The `type` tag, if present and a string.
    #[must_use]
    pub fn msg_type(&self) -> Option<&str> {
        self.value.get("type").and_then(Value::as_str)
    }

    /// The frame's request id, if any.
    #[must_use]
    pub fn id(&self) -> Option<u64> {
        self.value.get("id").and_then(Value::as_u64)
    }

    /// Looks up a top-level field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.value.get(key)
    }

    /// The exact text of the frame.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Consumes the frame, returning its text.
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }

    /// Returns a copy of this frame with `result` replaced.
    #[must_use]
    pub fn with_result(&self, result: Vec<Value>) -> Self {
        let mut value = self.value.clone();
        value.insert("result".to_string(), Value::Array(result));
        Self::from_object(value)
    }
}

/// Entity identifier of a state object, or `""` when absent.
#[must_use]
pub fn entity_id_of(state: &Value) -> &str {
    state
        .get("entity_id")
        .and_then(Value::as_str)
        .unwrap_or_default()
}

/// Classification of a frame received from the upstream platform.
#[derive(Debug, PartialEq)]
pub enum UpstreamMessage<'a> {
    /// `auth_required`: informational.
    AuthRequired,
    /// `auth_ok`: the token was accepted.
    AuthOk,
    /// `auth_invalid`: the token was rejected.
    AuthInvalid {
        /// Upstream explanation, if any.
        message: Option<&'a str>,
    },
    /// `result` carrying a list of state objects.
    BulkResult {
        /// The unfiltered states.
        states: &'a [Value],
    },
    /// `event` of subtype `state_changed`.
    StateChanged {
        /// Changed entity, `""` when the event is malformed.
        entity_id: &'a str,
    },
    /// Anything else; relayed verbatim.
    Other,
}

impl<'a> UpstreamMessage<'a> {
    /// Classifies an upstream frame.
    #[must_use]
    pub fn classify(frame: &'a Frame) -> Self {
        match frame.msg_type() {
            Some("auth_required") => Self::AuthRequired,
            Some("auth_ok") => Self::AuthOk,
            Some("auth_invalid") => Self::AuthInvalid {
                message: frame.get("message").and_then(Value::as_str),
            },
            Some("result") => match frame.get("result") {
                Some(Value::Array(states)) => Self::BulkResult { states },
                _ => Self::Other,
            },
            Some("event") => {
                let event = frame.get("event");
                let is_state_changed = event
                    .and_then(|e| e.get("event_type"))
                    .and_then(Value::as_str)
                    == Some("state_changed");
                if is_state_changed {
                    let entity_id = event
                        .and_then(|e| e.get("data"))
                        .map(entity_id_of)
                        .unwrap_or_default();
                    Self::StateChanged { entity_id }
                } else {
                    Self::Other
                }
            }
            _ => Self::Other,
        }
    }
}

/// Classification of a frame received from the browser client.
#[derive(Debug, PartialEq)]
pub enum ClientMessage {
    /// Liveness probe, answered locally.
    Ping,
    /// Replace the session's interest set.
    SetSelectedEntities {
        /// Requested entity identifiers; non-string entries are skipped.
        entity_ids: Vec<String>,
    },
    /// Any other command; relayed upstream verbatim.
    Forward,
}

impl ClientMessage {
    /// Classifies a client frame.
    #[must_use]
    pub fn classify(frame: &Frame) -> Self {
        match frame.msg_type() {
            Some("ping") => Self::Ping,
            Some("set_selected_entities") => {
                let entity_ids = frame
                    .get("entity_ids")
                    .and_then(Value::as_array)
                    .map(|ids| {
                        ids.iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();
                Self::SetSelectedEntities { entity_ids }
            }
            _ => Self::Forward,
        }
    }
}
