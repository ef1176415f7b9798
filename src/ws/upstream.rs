//! Upstream session: the one outbound connection to the platform's
//! event WebSocket.
//!
//! Opens the socket, authenticates, subscribes to `state_changed`, then
//! classifies every inbound frame and pushes accepted ones onto the
//! outbound relay queue. Errors never leave this task; they surface as a
//! session phase change plus, where useful, a [`ClientNotice`].

use std::ops::ControlFlow;
use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream::SplitStream;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};

use super::messages::ClientNotice;
use super::relay::RelaySender;
use super::session::{Session, SessionPhase};
use crate::config::UpstreamAuth;
use crate::domain::frame::entity_id_of;
use crate::domain::{Frame, InterestSet, UpstreamMessage};
use crate::error::GatewayError;

/// Read half of the upstream WebSocket.
type UpstreamStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Request id used for the session's own event subscription.
pub const SUBSCRIBE_REQUEST_ID: u64 = 1;

/// `auth` frame carrying the access token.
#[must_use]
pub fn auth_frame(access_token: &str) -> String {
    json!({"type": "auth", "access_token": access_token}).to_string()
}

/// `subscribe_events` frame for `state_changed`.
#[must_use]
pub fn subscribe_frame() -> String {
    json!({
        "id": SUBSCRIBE_REQUEST_ID,
        "type": "subscribe_events",
        "event_type": "state_changed",
    })
    .to_string()
}

/// What the read loop should do with one upstream frame.
#[derive(Debug, PartialEq)]
pub enum Dispatch {
    /// Informational; nothing to do.
    Ignore,
    /// `auth_ok`: subscribe and mark ready.
    Authenticated,
    /// `auth_invalid`: terminal for the session.
    Rejected(Option<String>),
    /// Push this frame to the client.
    Relay(Frame),
    /// Filtered out.
    Drop,
}

/// Classifies an upstream frame and applies the entity filter.
///
/// Bulk results are narrowed to the accepted states; a result with no
/// accepted state at all is suppressed rather than relayed empty.
pub async fn dispatch(frame: &Frame, interest: &InterestSet) -> Dispatch {
    match UpstreamMessage::classify(frame) {
        UpstreamMessage::AuthRequired => Dispatch::Ignore,
        UpstreamMessage::AuthOk => Dispatch::Authenticated,
        UpstreamMessage::AuthInvalid { message } => {
            Dispatch::Rejected(message.map(str::to_string))
        }
        UpstreamMessage::BulkResult { states } => {
            let unnamed = states.iter().filter(|s| entity_id_of(s).is_empty()).count();
            if unnamed > 0 {
                debug!(unnamed, "dropping result entries without entity_id");
            }
            let kept: Vec<Value> = interest
                .retain(states.iter().collect(), |s| entity_id_of(s))
                .await
                .into_iter()
                .cloned()
                .collect();
            if kept.is_empty() {
                debug!(
                    id = ?frame.id(),
                    total = states.len(),
                    "suppressing result with no matching entities"
                );
                Dispatch::Drop
            } else {
                trace!(id = ?frame.id(), kept = kept.len(), total = states.len(), "filtered result");
                Dispatch::Relay(frame.with_result(kept))
            }
        }
        UpstreamMessage::StateChanged { entity_id } => {
            if entity_id.is_empty() {
                warn!("state_changed event without entity_id");
                return Dispatch::Drop;
            }
            if interest.decide(entity_id).await.is_forward() {
                trace!(entity_id, "forwarding state_changed");
                Dispatch::Relay(frame.clone())
            } else {
                Dispatch::Drop
            }
        }
        UpstreamMessage::Other => Dispatch::Relay(frame.clone()),
    }
}

/// Owns the upstream connection for one proxy session.
pub struct UpstreamSession {
    session: Arc<Session>,
    url: String,
    access_token: String,
    outbound: RelaySender<Frame>,
}

impl std::fmt::Debug for UpstreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamSession")
            .field("session", &self.session.id())
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl UpstreamSession {
    /// Prepares (but does not open) the upstream connection.
    #[must_use]
    pub fn new(session: Arc<Session>, auth: &UpstreamAuth, outbound: RelaySender<Frame>) -> Self {
        Self {
            session,
            url: auth.websocket_url(),
            access_token: auth.access_token().to_string(),
            outbound,
        }
    }

    /// Connects, authenticates and runs the read loop until either side
    /// closes.
    pub async fn run(self) {
        let mut stream = match self.connect().await {
            Ok(stream) => stream,
            Err(e) => {
                if self.session.is_live() {
                    error!(url = %self.url, error = %e, "upstream connection failed");
                    self.notify(ClientNotice::error(format!(
                        "WebSocket connection failed: {e}"
                    )));
                }
                self.session.close();
                return;
            }
        };

        let mut phase = self.session.watch();
        loop {
            let message = tokio::select! {
                message = stream.next() => message,
                _ = phase.wait_for(|p| !p.is_live()) => {
                    debug!("session ended, stopping upstream reader");
                    break;
                }
            };

            match message {
                Some(Ok(Message::Text(text))) => {
                    if self.handle_text(text.as_str()).await.is_break() {
                        break;
                    }
                }
                Some(Ok(Message::Close(reason))) => {
                    info!(?reason, "upstream closed the connection");
                    self.on_closed();
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(
                    e @ (WsError::ConnectionClosed | WsError::AlreadyClosed | WsError::Io(_)),
                )) => {
                    warn!(error = %e, "upstream connection lost");
                    self.on_closed();
                    break;
                }
                Some(Err(e)) => {
                    warn!(error = %e, "upstream websocket error");
                    self.session.clear_ready();
                }
                None => {
                    debug!("upstream stream ended");
                    self.on_closed();
                    break;
                }
            }
        }
    }

    async fn connect(&self) -> Result<UpstreamStream, GatewayError> {
        debug!(url = %self.url, "connecting upstream");
        let (socket, _response) = tokio_tungstenite::connect_async(self.url.as_str()).await?;
        let (sink, stream) = socket.split();
        self.session.attach_upstream(sink).await;

        if !self.session.transition(SessionPhase::AuthPending) {
            // Torn down while connecting.
            self.session.close_upstream().await;
            return Err(GatewayError::Internal("session closed while connecting".to_string()));
        }
        self.session
            .send_handshake(auth_frame(&self.access_token))
            .await?;
        info!(url = %self.url, "upstream connected, authenticating");
        Ok(stream)
    }

    async fn handle_text(&self, text: &str) -> ControlFlow<()> {
        let frame = match Frame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "invalid JSON from upstream");
                return ControlFlow::Continue(());
            }
        };

        match dispatch(&frame, self.session.interest()).await {
            Dispatch::Ignore | Dispatch::Drop => {}
            Dispatch::Relay(frame) => {
                self.notify_frame(frame);
            }
            Dispatch::Authenticated => {
                if let Err(e) = self.session.send_handshake(subscribe_frame()).await {
                    warn!(error = %e, "failed to subscribe to state_changed events");
                }
                if self.session.transition(SessionPhase::Ready) {
                    info!("upstream authenticated");
                    self.notify(ClientNotice::connected());
                }
            }
            Dispatch::Rejected(reason) => {
                error!(reason = reason.as_deref().unwrap_or(""), "upstream authentication failed");
                let err = GatewayError::AuthInvalid(reason);
                self.notify(ClientNotice::error(format!(
                    "Home Assistant authentication failed ({err})"
                )));
                self.session.close();
                self.session.close_upstream().await;
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn on_closed(&self) {
        if self.session.is_live() {
            self.notify(ClientNotice::upstream_closed());
        }
        self.session.close();
    }

    fn notify(&self, notice: ClientNotice) {
        self.notify_frame(notice.to_frame());
    }

    fn notify_frame(&self, frame: Frame) {
        if !self.outbound.push(frame) {
            trace!("client queue gone, dropping frame");
        }
    }
}
