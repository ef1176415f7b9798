//! Shared state of one proxy session.
//!
//! A [`Session`] is created per client connection and shared (via `Arc`)
//! between the controller, the upstream reader and the inbound sender. The
//! session [`SessionPhase`] lives in a `watch` channel: it is both the
//! readiness/liveness flag pair and the only cancellation signal.
//!
//! ```text
//! Connecting ──► AuthPending ──► Ready ◄──► AuthPending (transient error)
//!      │              │            │
//!      └──────────────┴────────────┴──► Closing ──► Closed
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::SinkExt;
use futures_util::stream::SplitSink;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use crate::domain::InterestSet;
use crate::error::GatewayError;

/// Write half of the upstream WebSocket.
pub type UpstreamSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Lifecycle phase of a proxy session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Opening the upstream socket.
    Connecting,
    /// Socket open, waiting for `auth_ok`.
    AuthPending,
    /// Authenticated and subscribed; relayed sends are allowed.
    Ready,
    /// Teardown requested.
    Closing,
    /// Either side has closed.
    Closed,
}

impl SessionPhase {
    /// Background tasks keep running while this holds.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Connecting | Self::AuthPending | Self::Ready)
    }

    /// Only this phase permits relayed upstream sends.
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Per-connection shared state.
pub struct Session {
    id: Uuid,
    phase: watch::Sender<SessionPhase>,
    interest: InterestSet,
    upstream: Mutex<Option<UpstreamSink>>,
    write_timeout: Duration,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("phase", &self.phase())
            .field("interest", &self.interest)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session in [`SessionPhase::Connecting`].
    ///
    /// `write_timeout` bounds every upstream write and the final close,
    /// including the wait for the socket lock.
    #[must_use]
    pub fn new(write_timeout: Duration) -> Arc<Self> {
        let (phase, _) = watch::channel(SessionPhase::Connecting);
        Arc::new(Self {
            id: Uuid::new_v4(),
            phase,
            interest: InterestSet::new(),
            upstream: Mutex::new(None),
            write_timeout,
        })
    }

    /// Session identifier used in logs.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// The client's interest set.
    #[must_use]
    pub const fn interest(&self) -> &InterestSet {
        &self.interest
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    /// Returns `true` until either side closes.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.phase().is_live()
    }

    /// Returns `true` once `auth_ok` was observed and not since cleared.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.phase().is_ready()
    }

    /// Receiver for phase changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SessionPhase> {
        self.phase.subscribe()
    }

    /// Moves to `next` if the transition is legal. Terminal phases are
    /// never left.
    pub fn transition(&self, next: SessionPhase) -> bool {
        self.phase.send_if_modified(|current| {
            let allowed = match (*current, next) {
                (from, to) if from == to => false,
                (SessionPhase::Closed, _) => false,
                (SessionPhase::Closing, to) => to == SessionPhase::Closed,
                (SessionPhase::Connecting, SessionPhase::Ready) => false,
                _ => true,
            };
            if allowed {
                tracing::debug!(from = ?*current, to = ?next, "session phase");
                *current = next;
            }
            allowed
        })
    }

    /// `Ready` → `AuthPending`; used after a transient upstream error.
    pub fn clear_ready(&self) {
        if self.is_ready() {
            self.transition(SessionPhase::AuthPending);
        }
    }

    /// Marks the session not live. Idempotent.
    pub fn close(&self) {
        self.transition(SessionPhase::Closed);
    }

    /// Waits up to `limit` for readiness.
    ///
    /// Returns `false` on timeout or if the session stops being live first.
    pub async fn wait_ready(&self, limit: Duration) -> bool {
        let mut rx = self.watch();
        match tokio::time::timeout(limit, rx.wait_for(|p| p.is_ready() || !p.is_live())).await {
            Ok(Ok(phase)) => phase.is_ready(),
            _ => false,
        }
    }

    /// Stores the write half of a freshly opened upstream socket.
    pub async fn attach_upstream(&self, sink: UpstreamSink) {
        *self.upstream.lock().await = Some(sink);
    }

    /// Writes a handshake frame (`auth`, `subscribe_events`) regardless of
    /// readiness.
    pub(crate) async fn send_handshake(&self, text: String) -> Result<(), GatewayError> {
        self.write(text).await
    }

    /// Relays a client frame upstream.
    ///
    /// # Errors
    ///
    /// [`GatewayError::NotReady`] before `auth_ok` or after close,
    /// [`GatewayError::WebSocket`] when the write fails and
    /// [`GatewayError::WriteTimeout`] when it stalls.
    pub async fn send_upstream(&self, text: &str) -> Result<(), GatewayError> {
        if !self.is_ready() {
            return Err(GatewayError::NotReady);
        }
        self.write(text.to_string()).await
    }

    async fn write(&self, text: String) -> Result<(), GatewayError> {
        let write = async {
            let mut guard = self.upstream.lock().await;
            let sink = guard.as_mut().ok_or(GatewayError::NotReady)?;
            sink.send(Message::text(text)).await?;
            Ok::<(), GatewayError>(())
        };
        tokio::time::timeout(self.write_timeout, write)
            .await
            .map_err(|_| GatewayError::WriteTimeout)?
    }

    /// Closes and drops the upstream socket if it is open.
    ///
    /// Gives up after the write timeout; a socket still held by a stalled
    /// writer is dropped with the session.
    pub async fn close_upstream(&self) {
        let close = async {
            let sink = self.upstream.lock().await.take();
            if let Some(mut sink) = sink
                && let Err(e) = sink.close().await
            {
                tracing::debug!(error = %e, "upstream close failed");
            }
        };
        if tokio::time::timeout(self.write_timeout, close).await.is_err() {
            tracing::warn!("upstream close timed out; dropping socket");
        }
    }
}
