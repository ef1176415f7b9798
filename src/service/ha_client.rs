//! REST client for the upstream platform API.
//!
//! Thin forwarders: each call translates into one bearer-authenticated HTTP
//! request and maps transport failures and non-success statuses onto
//! [`GatewayError`].

use std::collections::HashSet;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::config::UpstreamAuth;
use crate::domain::is_valid_entity_id;
use crate::error::GatewayError;

/// Upstream error bodies are cut to this many characters.
const DETAILS_LIMIT: usize = 200;

/// Raw upstream response relayed without re-encoding.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Upstream status code.
    pub status: u16,
    /// Upstream `Content-Type`, or `application/json` when missing.
    pub content_type: String,
    /// Upstream body.
    pub body: Vec<u8>,
}

/// Result of probing the API root.
#[derive(Debug, Clone)]
pub struct ProbeStatus {
    /// Upstream status code.
    pub status: u16,
    /// Upstream `Content-Type`, or `unknown`.
    pub content_type: String,
}

/// One of the supported service calls.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceCall {
    /// `number.set_value`
    NumberSetValue {
        /// Target entity.
        entity_id: String,
        /// New value, passed through as given.
        value: Value,
    },
    /// `switch.turn_on`
    SwitchTurnOn {
        /// Target entity.
        entity_id: String,
    },
    /// `switch.turn_off`
    SwitchTurnOff {
        /// Target entity.
        entity_id: String,
    },
    /// `select.select_option`
    SelectOption {
        /// Target entity.
        entity_id: String,
        /// Option to select.
        option: Value,
    },
    /// `light.turn_on`
    LightTurnOn {
        /// Target entity.
        entity_id: String,
    },
    /// `light.turn_off`
    LightTurnOff {
        /// Target entity.
        entity_id: String,
    },
}

impl ServiceCall {
    /// `(domain, service)` pair used in the upstream path.
    #[must_use]
    pub const fn route(&self) -> (&'static str, &'static str) {
        match self {
            Self::NumberSetValue { .. } => ("number", "set_value"),
            Self::SwitchTurnOn { .. } => ("switch", "turn_on"),
            Self::SwitchTurnOff { .. } => ("switch", "turn_off"),
            Self::SelectOption { .. } => ("select", "select_option"),
            Self::LightTurnOn { .. } => ("light", "turn_on"),
            Self::LightTurnOff { .. } => ("light", "turn_off"),
        }
    }

    /// Target entity.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        match self {
            Self::NumberSetValue { entity_id, .. }
            | Self::SwitchTurnOn { entity_id }
            | Self::SwitchTurnOff { entity_id }
            | Self::SelectOption { entity_id, .. }
            | Self::LightTurnOn { entity_id }
            | Self::LightTurnOff { entity_id } => entity_id,
        }
    }

    /// JSON body sent upstream.
    #[must_use]
    pub fn payload(&self) -> Value {
        match self {
            Self::NumberSetValue { entity_id, value } => {
                json!({"entity_id": entity_id, "value": value})
            }
            Self::SelectOption { entity_id, option } => {
                json!({"entity_id": entity_id, "option": option})
            }
            _ => json!({"entity_id": self.entity_id()}),
        }
    }

    /// Message returned to the client on success.
    #[must_use]
    pub fn success_message(&self) -> String {
        let id = self.entity_id();
        match self {
            Self::NumberSetValue { .. } => format!("Entity {id} updated successfully."),
            Self::SwitchTurnOn { .. } => format!("Switch {id} turned on successfully."),
            Self::SwitchTurnOff { .. } => format!("Switch {id} turned off successfully."),
            Self::SelectOption { .. } => format!("Select entity {id} updated successfully."),
            Self::LightTurnOn { .. } => format!("Light {id} turned on successfully."),
            Self::LightTurnOff { .. } => format!("Light {id} turned off successfully."),
        }
    }

    /// Message returned to the client when upstream refuses the call.
    #[must_use]
    pub fn failure_message(&self) -> String {
        let id = self.entity_id();
        match self {
            Self::NumberSetValue { .. } => format!("Failed to update entity {id}."),
            Self::SwitchTurnOn { .. } => format!("Failed to turn on switch {id}."),
            Self::SwitchTurnOff { .. } => format!("Failed to turn off switch {id}."),
            Self::SelectOption { .. } => format!("Failed to update select entity {id}."),
            Self::LightTurnOn { .. } => format!("Failed to turn on light {id}."),
            Self::LightTurnOff { .. } => format!("Failed to turn off light {id}."),
        }
    }
}

/// Bearer-authenticated client for the upstream REST API.
pub struct HaClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    missing_entities: Mutex<HashSet<String>>,
}

impl std::fmt::Debug for HaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HaClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HaClient {
    /// Creates a client for the resolved upstream.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if the HTTP client cannot be built.
    pub fn new(auth: &UpstreamAuth, timeout: Duration) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Internal(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: auth.rest_base_url(),
            token: auth.access_token().to_string(),
            missing_entities: Mutex::new(HashSet::new()),
        })
    }

    /// API base URL, without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `GET /` — checks that the API answers.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the API cannot be reached.
    pub async fn probe(&self) -> Result<ProbeStatus, GatewayError> {
        let response = self
            .http
            .get(self.url("/"))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok(ProbeStatus {
            status: response.status().as_u16(),
            content_type: content_type(&response).unwrap_or_else(|| "unknown".to_string()),
        })
    }

    /// `POST /template` — renders a template upstream.
    ///
    /// # Errors
    ///
    /// Transport errors, or [`GatewayError::UpstreamStatus`] when upstream
    /// does not answer 200.
    pub async fn render_template(&self, template: &str) -> Result<RawResponse, GatewayError> {
        let response = self
            .http
            .post(self.url("template"))
            .bearer_auth(&self.token)
            .json(&json!({"template": template}))
            .send()
            .await?;

        let status = response.status().as_u16();
        let content_type = content_type(&response);
        if status != 200 {
            tracing::error!(status, "failed to execute template");
            let details = truncate(&response.text().await.unwrap_or_default());
            return Err(GatewayError::UpstreamStatus {
                status,
                message: format!(
                    "HA API returned {status} ({})",
                    content_type.as_deref().unwrap_or("unknown")
                ),
                details,
            });
        }

        Ok(RawResponse {
            status,
            content_type: content_type.unwrap_or_else(|| "application/json".to_string()),
            body: response.bytes().await?.to_vec(),
        })
    }

    /// `GET /states/{entity_id}` — fetches one entity state.
    ///
    /// A 404 is logged once per entity until it becomes available again.
    ///
    /// # Errors
    ///
    /// [`GatewayError::InvalidRequest`] for a malformed id, transport
    /// errors, or [`GatewayError::UpstreamStatus`] for 404 and any other
    /// non-success status.
    pub async fn entity_state(&self, entity_id: &str) -> Result<Value, GatewayError> {
        if !is_valid_entity_id(entity_id) {
            return Err(GatewayError::InvalidRequest("Invalid entity_id".to_string()));
        }
        let response = self
            .http
            .get(self.url(&format!("states/{entity_id}")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let status = response.status().as_u16();

        if status == 200 {
            if self.missing_entities.lock().await.remove(entity_id) {
                tracing::info!(entity_id, "entity is available again");
            }
            return Ok(response.json::<Value>().await?);
        }

        if status == 404 {
            if self.missing_entities.lock().await.insert(entity_id.to_string()) {
                tracing::info!(entity_id, "upstream reports entity unavailable (404); continuing without it");
            }
            return Err(GatewayError::UpstreamStatus {
                status,
                message: "Entity not found".to_string(),
                details: entity_id.to_string(),
            });
        }

        tracing::warn!(entity_id, status, "failed to fetch entity");
        Err(GatewayError::UpstreamStatus {
            status,
            message: "Unauthorized or entity not found".to_string(),
            details: truncate(&response.text().await.unwrap_or_default()),
        })
    }

    /// `POST /services/{domain}/{service}` — invokes a service.
    ///
    /// # Errors
    ///
    /// Transport errors, or [`GatewayError::UpstreamStatus`] when upstream
    /// does not answer 200.
    pub async fn call_service(&self, call: &ServiceCall) -> Result<String, GatewayError> {
        let (domain, service) = call.route();
        let response = self
            .http
            .post(self.url(&format!("services/{domain}/{service}")))
            .bearer_auth(&self.token)
            .json(&call.payload())
            .send()
            .await?;
        let status = response.status().as_u16();

        if status == 200 {
            tracing::debug!(domain, service, entity_id = call.entity_id(), "service call ok");
            return Ok(call.success_message());
        }

        tracing::warn!(domain, service, entity_id = call.entity_id(), status, "service call failed");
        Err(GatewayError::UpstreamStatus {
            status,
            message: call.failure_message(),
            details: response.text().await.unwrap_or_default(),
        })
    }
}

fn content_type(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn truncate(text: &str) -> String {
    text.chars().take(DETAILS_LIMIT).collect()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use tokio::net::TcpListener;

    use super::*;

    async fn entity_state_route(
        State(available): State<Arc<AtomicBool>>,
        Path(entity_id): Path<String>,
    ) -> Response {
        if available.load(Ordering::SeqCst) {
            Json(json!({"entity_id": entity_id, "state": "on"})).into_response()
        } else {
            (StatusCode::NOT_FOUND, "404: Not Found").into_response()
        }
    }

    /// Serves `GET /api/states/{id}`, answering 404 until `available` is set.
    async fn serve_states(available: Arc<AtomicBool>) -> String {
        let app = Router::new()
            .route("/api/states/{entity_id}", get(entity_state_route))
            .with_state(available);
        let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind failed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("no local addr");
        };
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    fn supervised() -> UpstreamAuth {
        UpstreamAuth::Supervisor {
            token: "tok".to_string(),
        }
    }

    #[test]
    fn service_routes() {
        let call = ServiceCall::SelectOption {
            entity_id: "select.mode".to_string(),
            option: json!("Custom"),
        };
        assert_eq!(call.route(), ("select", "select_option"));
        assert_eq!(
            call.payload(),
            json!({"entity_id": "select.mode", "option": "Custom"})
        );
        assert_eq!(call.success_message(), "Select entity select.mode updated successfully.");
    }

    #[test]
    fn simple_service_payload_has_only_entity() {
        let call = ServiceCall::LightTurnOff {
            entity_id: "light.led".to_string(),
        };
        assert_eq!(call.route(), ("light", "turn_off"));
        assert_eq!(call.payload(), json!({"entity_id": "light.led"}));
        assert_eq!(call.failure_message(), "Failed to turn off light light.led.");
    }

    #[test]
    fn number_payload_keeps_value_type() {
        let call = ServiceCall::NumberSetValue {
            entity_id: "number.zone_1_begin_x".to_string(),
            value: json!(-1500),
        };
        assert_eq!(
            call.payload(),
            json!({"entity_id": "number.zone_1_begin_x", "value": -1500})
        );
    }

    #[test]
    fn urls_join_cleanly() {
        let Ok(client) = HaClient::new(&supervised(), Duration::from_secs(1)) else {
            panic!("client should build");
        };
        assert_eq!(client.url("/"), "http://supervisor/core/api/");
        assert_eq!(client.url("template"), "http://supervisor/core/api/template");
    }

    #[test]
    fn debug_hides_token() {
        let Ok(client) = HaClient::new(&supervised(), Duration::from_secs(1)) else {
            panic!("client should build");
        };
        assert!(!format!("{client:?}").contains("tok\""));
    }

    #[test]
    fn truncate_limits_characters() {
        let long = "é".repeat(500);
        assert_eq!(truncate(&long).chars().count(), DETAILS_LIMIT);
    }

    #[tokio::test]
    async fn missing_entity_is_remembered_until_it_returns() {
        let available = Arc::new(AtomicBool::new(false));
        let auth = UpstreamAuth::Direct {
            base_url: serve_states(Arc::clone(&available)).await,
            token: "tok".to_string(),
        };
        let Ok(client) = HaClient::new(&auth, Duration::from_secs(2)) else {
            panic!("client should build");
        };

        for _ in 0..2 {
            let result = client.entity_state("sensor.office_target_1_x").await;
            assert!(matches!(
                result,
                Err(GatewayError::UpstreamStatus { status: 404, .. })
            ));
            assert_eq!(client.missing_entities.lock().await.len(), 1);
        }

        available.store(true, Ordering::SeqCst);
        let Ok(value) = client.entity_state("sensor.office_target_1_x").await else {
            panic!("entity should be available again");
        };
        assert_eq!(value["state"], "on");
        assert!(client.missing_entities.lock().await.is_empty());
    }

    #[tokio::test]
    async fn malformed_entity_id_is_refused_locally() {
        let auth = UpstreamAuth::Direct {
            base_url: "http://127.0.0.1:1".to_string(),
            token: "tok".to_string(),
        };
        let Ok(client) = HaClient::new(&auth, Duration::from_secs(1)) else {
            panic!("client should build");
        };
        let result = client.entity_state("../config").await;
        assert!(matches!(result, Err(GatewayError::InvalidRequest(_))));
    }
}
