//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Upstream credentials come either from
//! the platform-managed proxy (`SUPERVISOR_TOKEN`) or from a direct
//! `HA_URL` + `HA_TOKEN` pair; without either the process refuses to start.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::GatewayError;

/// WebSocket endpoint of the platform-managed proxy.
pub const SUPERVISOR_WS_URL: &str = "ws://supervisor/core/websocket";

/// REST base of the platform-managed proxy.
pub const SUPERVISOR_API_URL: &str = "http://supervisor/core/api";

/// Where and how to authenticate against the upstream platform.
#[derive(Clone, PartialEq, Eq)]
pub enum UpstreamAuth {
    /// Running behind the platform-managed proxy.
    Supervisor {
        /// Managed-proxy token.
        token: String,
    },
    /// Talking to the platform directly.
    Direct {
        /// HTTP(S) base URL, e.g. `http://homeassistant.local:8123`.
        base_url: String,
        /// Long-lived bearer token.
        token: String,
    },
}

impl UpstreamAuth {
    /// Resolves the credential source. The managed-proxy token wins when
    /// both sources are present.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] when neither a managed-proxy token
    /// nor a complete URL + token pair is available, or when an `https`
    /// URL is given to a build without the `tls` feature.
    pub fn resolve(
        supervisor_token: Option<String>,
        ha_url: Option<String>,
        ha_token: Option<String>,
    ) -> Result<Self, GatewayError> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        if let Some(token) = present(supervisor_token) {
            return Ok(Self::Supervisor { token });
        }
        match (present(ha_url), present(ha_token)) {
            (Some(base_url), _)
                if !cfg!(feature = "tls") && base_url.trim().starts_with("https://") =>
            {
                Err(GatewayError::Config(format!(
                    "HA_URL {base_url} needs TLS, but this build lacks the `tls` feature"
                )))
            }
            (Some(base_url), Some(token)) => Ok(Self::Direct { base_url, token }),
            _ => Err(GatewayError::Config(
                "no SUPERVISOR_TOKEN found and no HA_URL and HA_TOKEN provided".to_string(),
            )),
        }
    }

    /// Token sent in the upstream `auth` frame and REST `Authorization` header.
    #[must_use]
    pub fn access_token(&self) -> &str {
        match self {
            Self::Supervisor { token } | Self::Direct { token, .. } => token,
        }
    }

    /// Upstream WebSocket URL.
    ///
    /// Direct mode swaps `http`/`https` for `ws`/`wss`, strips a trailing
    /// `/` and `/api`, then appends `/api/websocket`.
    #[must_use]
    pub fn websocket_url(&self) -> String {
        match self {
            Self::Supervisor { .. } => SUPERVISOR_WS_URL.to_string(),
            Self::Direct { base_url, .. } => {
                let origin = origin_of(base_url);
                let ws_origin = if let Some(rest) = origin.strip_prefix("https://") {
                    format!("wss://{rest}")
                } else if let Some(rest) = origin.strip_prefix("http://") {
                    format!("ws://{rest}")
                } else {
                    origin.to_string()
                };
                format!("{ws_origin}/api/websocket")
            }
        }
    }

    /// Upstream REST API base, without trailing slash.
    #[must_use]
    pub fn rest_base_url(&self) -> String {
        match self {
            Self::Supervisor { .. } => SUPERVISOR_API_URL.to_string(),
            Self::Direct { base_url, .. } => format!("{}/api", origin_of(base_url)),
        }
    }

    /// Returns `true` when authenticating through the managed proxy.
    #[must_use]
    pub const fn is_supervised(&self) -> bool {
        matches!(self, Self::Supervisor { .. })
    }
}

impl std::fmt::Debug for UpstreamAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Supervisor { .. } => f
                .debug_struct("Supervisor")
                .field("token", &"<redacted>")
                .finish(),
            Self::Direct { base_url, .. } => f
                .debug_struct("Direct")
                .field("base_url", base_url)
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}

/// `https://host/api/` -> `https://host`
fn origin_of(base_url: &str) -> &str {
    let trimmed = base_url.trim().trim_end_matches('/');
    trimmed.strip_suffix("/api").unwrap_or(trimmed)
}

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:5000`).
    pub listen_addr: SocketAddr,

    /// Resolved upstream credentials.
    pub upstream: UpstreamAuth,

    /// Whether `HA_URL` was set, regardless of which source won.
    pub ha_url_override: bool,

    /// Whether `HA_TOKEN` was set, regardless of which source won.
    pub ha_token_override: bool,

    /// Upper bound on any blocking wait inside a proxy session.
    pub poll_interval: Duration,

    /// How long the inbound sender waits for readiness before re-queueing.
    pub ready_wait: Duration,

    /// Pause after a failed upstream send.
    pub send_backoff: Duration,

    /// Maximum send attempts per inbound frame (`0` = unbounded).
    pub send_max_attempts: u32,

    /// Timeout for REST pass-through calls.
    pub http_timeout: Duration,
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if no upstream credentials are
    /// available or `LISTEN_ADDR` cannot be parsed.
    pub fn from_env() -> Result<Self, GatewayError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Falls back to defaults for every tuning knob that is missing or
    /// unparsable.
    ///
    /// # Errors
    ///
    /// Same as [`GatewayConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen_addr: SocketAddr = lookup("LISTEN_ADDR")
            .unwrap_or_else(|| "0.0.0.0:5000".to_string())
            .parse()
            .map_err(|e| GatewayError::Config(format!("invalid LISTEN_ADDR: {e}")))?;

        let ha_url = lookup("HA_URL");
        let ha_token = lookup("HA_TOKEN");
        let ha_url_override = ha_url.is_some();
        let ha_token_override = ha_token.is_some();
        let upstream = UpstreamAuth::resolve(lookup("SUPERVISOR_TOKEN"), ha_url, ha_token)?;

        let parse = |key: &str, default: u64| -> u64 {
            lookup(key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        };

        Ok(Self {
            listen_addr,
            upstream,
            ha_url_override,
            ha_token_override,
            poll_interval: Duration::from_millis(parse("CLIENT_POLL_INTERVAL_MS", 1_000).max(1)),
            ready_wait: Duration::from_secs(parse("READY_WAIT_SECS", 5).max(1)),
            send_backoff: Duration::from_millis(parse("SEND_RETRY_BACKOFF_MS", 250)),
            send_max_attempts: u32::try_from(parse("SEND_MAX_ATTEMPTS", 0)).unwrap_or(u32::MAX),
            http_timeout: Duration::from_secs(parse("HTTP_TIMEOUT_SECS", 10).max(1)),
        })
    }

    /// Session timing knobs for a proxy session.
    #[must_use]
    pub const fn session_timing(&self) -> SessionTiming {
        SessionTiming {
            poll_interval: self.poll_interval,
            ready_wait: self.ready_wait,
            send_backoff: self.send_backoff,
            send_max_attempts: self.send_max_attempts,
        }
    }
}

/// Per-session timing, copied out of [`GatewayConfig`].
#[derive(Debug, Clone, Copy)]
pub struct SessionTiming {
    /// Upper bound on any blocking wait.
    pub poll_interval: Duration,
    /// Readiness wait before an inbound frame is re-queued.
    pub ready_wait: Duration,
    /// Pause after a failed upstream send.
    pub send_backoff: Duration,
    /// Maximum send attempts per inbound frame (`0` = unbounded).
    pub send_max_attempts: u32,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<GatewayConfig, GatewayError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        GatewayConfig::from_lookup(|key| vars.get(key).cloned())
    }

    fn direct(base_url: &str) -> UpstreamAuth {
        UpstreamAuth::Direct {
            base_url: base_url.to_string(),
            token: "t".to_string(),
        }
    }

    #[test]
    fn supervisor_uses_well_known_address() {
        let auth = UpstreamAuth::Supervisor {
            token: "super".to_string(),
        };
        assert_eq!(auth.websocket_url(), "ws://supervisor/core/websocket");
        assert_eq!(auth.rest_base_url(), "http://supervisor/core/api");
    }

    #[test]
    fn direct_https_with_api_suffix() {
        assert_eq!(
            direct("https://ha.example/api/").websocket_url(),
            "wss://ha.example/api/websocket"
        );
    }

    #[test]
    fn direct_http_with_port() {
        let auth = direct("http://example.local:8123/api");
        assert_eq!(auth.websocket_url(), "ws://example.local:8123/api/websocket");
        assert_eq!(auth.rest_base_url(), "http://example.local:8123/api");
    }

    #[test]
    fn direct_bare_origin() {
        let auth = direct("http://homeassistant.local:8123/");
        assert_eq!(
            auth.websocket_url(),
            "ws://homeassistant.local:8123/api/websocket"
        );
        assert_eq!(auth.rest_base_url(), "http://homeassistant.local:8123/api");
    }

    #[test]
    fn supervisor_token_preferred_over_direct_token() {
        let auth = UpstreamAuth::resolve(
            Some("T1".to_string()),
            Some("https://ha.example".to_string()),
            Some("T2".to_string()),
        );
        let Ok(auth) = auth else {
            panic!("expected credentials to resolve");
        };
        assert!(auth.is_supervised());
        assert_eq!(auth.access_token(), "T1");
    }

    #[test]
    fn missing_credentials_is_config_error() {
        let result = config_from(&[("HA_URL", "http://ha.local:8123")]);
        assert!(matches!(result, Err(GatewayError::Config(_))));

        let result = config_from(&[("SUPERVISOR_TOKEN", "  ")]);
        assert!(matches!(result, Err(GatewayError::Config(_))));
    }

    #[test]
    fn defaults_applied() {
        let Ok(cfg) = config_from(&[("SUPERVISOR_TOKEN", "abc")]) else {
            panic!("expected config");
        };
        assert_eq!(cfg.listen_addr.port(), 5000);
        assert_eq!(cfg.poll_interval, Duration::from_secs(1));
        assert_eq!(cfg.ready_wait, Duration::from_secs(5));
        assert_eq!(cfg.send_max_attempts, 0);
        assert!(!cfg.ha_url_override);
    }

    #[test]
    fn overrides_and_bad_values() {
        let Ok(cfg) = config_from(&[
            ("HA_URL", "http://ha.local:8123"),
            ("HA_TOKEN", "tok"),
            ("LISTEN_ADDR", "127.0.0.1:8099"),
            ("READY_WAIT_SECS", "2"),
            ("SEND_MAX_ATTEMPTS", "not-a-number"),
        ]) else {
            panic!("expected config");
        };
        assert_eq!(cfg.listen_addr.port(), 8099);
        assert_eq!(cfg.ready_wait, Duration::from_secs(2));
        assert_eq!(cfg.send_max_attempts, 0);
        assert!(cfg.ha_url_override && cfg.ha_token_override);
        assert_eq!(cfg.upstream.access_token(), "tok");
    }

    #[cfg(feature = "tls")]
    #[test]
    fn https_direct_url_accepted_with_tls() {
        let Ok(cfg) = config_from(&[("HA_URL", "https://ha.example/api/"), ("HA_TOKEN", "tok")])
        else {
            panic!("expected config");
        };
        assert_eq!(cfg.upstream.websocket_url(), "wss://ha.example/api/websocket");
        assert_eq!(cfg.upstream.rest_base_url(), "https://ha.example/api");
    }

    #[cfg(not(feature = "tls"))]
    #[test]
    fn https_direct_url_rejected_without_tls() {
        let result = config_from(&[("HA_URL", "https://ha.example/api/"), ("HA_TOKEN", "tok")]);
        assert!(matches!(result, Err(GatewayError::Config(msg)) if msg.contains("tls")));
        // Supervisor mode never needs TLS.
        let result = config_from(&[
            ("SUPERVISOR_TOKEN", "abc"),
            ("HA_URL", "https://ha.example"),
            ("HA_TOKEN", "tok"),
        ]);
        assert!(result.is_ok());
    }

    #[test]
    fn bad_listen_addr_rejected() {
        let result = config_from(&[("SUPERVISOR_TOKEN", "abc"), ("LISTEN_ADDR", "nope")]);
        assert!(matches!(result, Err(GatewayError::Config(_))));
    }

    #[test]
    fn debug_redacts_tokens() {
        let rendered = format!("{:?}", direct("http://x"));
        assert!(!rendered.contains("\"t\""));
        assert!(rendered.contains("redacted"));
    }
}
