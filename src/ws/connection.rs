//! Proxy session controller.
//!
//! Wires one browser connection to one upstream session: spawns the
//! upstream reader and the inbound sender, then pumps the outbound queue to
//! the client and client frames into the inbound queue until either side
//! closes.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tracing::{Instrument, debug, info, info_span, trace, warn};

use super::inbound::InboundSender;
use super::messages::ClientNotice;
use super::relay::{PendingFrame, RelayReceiver, RelaySender, relay_queue};
use super::session::{Session, SessionPhase};
use super::upstream::UpstreamSession;
use crate::config::{GatewayConfig, SessionTiming, UpstreamAuth};
use crate::domain::{ClientMessage, Frame};

type ClientSink = SplitSink<WebSocket, Message>;

/// Runs a proxy session for one upgraded client socket.
pub async fn run_connection(socket: WebSocket, config: Arc<GatewayConfig>) {
    let session = Session::new(config.poll_interval);
    let span = info_span!("proxy_session", session_id = %session.id());
    ProxySession::new(session, &config.upstream, config.session_timing())
        .run(socket)
        .instrument(span)
        .await;
}

/// Per-connection controller state.
#[derive(Debug)]
pub struct ProxySession {
    session: Arc<Session>,
    timing: SessionTiming,
    upstream: Option<UpstreamSession>,
    inbound_tx: RelaySender<PendingFrame>,
    inbound_rx: Option<RelayReceiver<PendingFrame>>,
    outbound_rx: RelayReceiver<Frame>,
}

impl ProxySession {
    /// Builds the queues and the (not yet started) upstream session.
    #[must_use]
    pub fn new(session: Arc<Session>, auth: &UpstreamAuth, timing: SessionTiming) -> Self {
        let (outbound_tx, outbound_rx) = relay_queue();
        let (inbound_tx, inbound_rx) = relay_queue();
        let upstream = UpstreamSession::new(Arc::clone(&session), auth, outbound_tx);
        Self {
            session,
            timing,
            upstream: Some(upstream),
            inbound_tx,
            inbound_rx: Some(inbound_rx),
            outbound_rx,
        }
    }

    /// Runs the client-facing loop, then tears the session down.
    pub async fn run(mut self, socket: WebSocket) {
        info!("client connected");
        let (mut ws_tx, mut ws_rx) = socket.split();

        let upstream_task = self
            .upstream
            .take()
            .map(|upstream| tokio::spawn(upstream.run().in_current_span()));
        let sender_task = self.inbound_rx.take().map(|queue| {
            let sender = InboundSender::new(
                Arc::clone(&self.session),
                self.inbound_tx.clone(),
                queue,
                self.timing,
            );
            tokio::spawn(sender.run().in_current_span())
        });

        let mut client_open = true;
        loop {
            if !self.flush(&mut ws_tx).await {
                client_open = false;
                break;
            }
            if !self.session.is_live() {
                break;
            }

            tokio::select! {
                biased;
                frame = self.outbound_rx.recv() => match frame {
                    Some(frame) => {
                        if ws_tx.send(Message::text(frame.into_text())).await.is_err() {
                            client_open = false;
                            break;
                        }
                    }
                    None => break,
                },
                message = ws_rx.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = self.handle_client_text(text.as_str()).await
                            && ws_tx.send(Message::text(reply.to_json())).await.is_err()
                        {
                            client_open = false;
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("client disconnected");
                        client_open = false;
                        break;
                    }
                    Some(Err(e)) => {
                        debug!(error = %e, "client socket error");
                        client_open = false;
                        break;
                    }
                    Some(Ok(_)) => {}
                },
                () = tokio::time::sleep(self.timing.poll_interval) => {}
            }
        }

        // Teardown
        if client_open {
            // Terminal notices pushed just before the session closed.
            self.flush(&mut ws_tx).await;
            let _ = ws_tx.close().await;
        }
        self.session.transition(SessionPhase::Closing);
        self.session.close_upstream().await;
        self.session.close();

        let grace = self.timing.poll_interval.saturating_mul(2);
        for task in [upstream_task, sender_task].into_iter().flatten() {
            if tokio::time::timeout(grace, task).await.is_err() {
                warn!("background task did not stop in time");
            }
        }
        info!("proxy session closed");
    }

    /// Sends every queued outbound frame, in order. Returns `false` once
    /// the client is gone.
    async fn flush(&mut self, ws_tx: &mut ClientSink) -> bool {
        for frame in self.outbound_rx.drain() {
            if ws_tx.send(Message::text(frame.into_text())).await.is_err() {
                return false;
            }
        }
        true
    }

    /// Handles one client text frame; returns a direct reply if any.
    async fn handle_client_text(&self, text: &str) -> Option<ClientNotice> {
        let frame = match Frame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "invalid JSON from client; dropping");
                return None;
            }
        };

        match ClientMessage::classify(&frame) {
            ClientMessage::Ping => Some(ClientNotice::Pong),
            ClientMessage::SetSelectedEntities { entity_ids } => {
                let count = self.session.interest().replace(entity_ids).await;
                info!(count, "updated selected entities");
                Some(ClientNotice::EntitiesUpdated { count })
            }
            ClientMessage::Forward => {
                trace!(msg_type = frame.msg_type().unwrap_or(""), "queueing client frame");
                self.inbound_tx.push(PendingFrame::new(frame));
                None
            }
        }
    }
}
