//! Inbound sender: drains client frames to the upstream socket.
//!
//! Frames are only written once the session is `Ready`. A frame that
//! cannot be sent yet (not ready, or a failed write) goes back to the tail
//! of the queue; it is discarded only when the session ends or, if a cap
//! is configured, after too many failed writes.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::relay::{PendingFrame, Recv, RelayReceiver, RelaySender};
use super::session::Session;
use crate::config::SessionTiming;

/// Background task relaying client frames upstream.
#[derive(Debug)]
pub struct InboundSender {
    session: Arc<Session>,
    requeue: RelaySender<PendingFrame>,
    queue: RelayReceiver<PendingFrame>,
    timing: SessionTiming,
}

impl InboundSender {
    /// Creates a sender over `queue`; `requeue` must feed the same queue.
    #[must_use]
    pub const fn new(
        session: Arc<Session>,
        requeue: RelaySender<PendingFrame>,
        queue: RelayReceiver<PendingFrame>,
        timing: SessionTiming,
    ) -> Self {
        Self {
            session,
            requeue,
            queue,
            timing,
        }
    }

    /// Runs until the session stops being live.
    pub async fn run(mut self) {
        loop {
            if !self.session.is_live() {
                break;
            }

            let mut pending = match self.queue.recv_timeout(self.timing.poll_interval).await {
                Recv::Item(pending) => pending,
                Recv::Timeout => continue,
                Recv::Closed => break,
            };

            if !self.session.is_live() {
                let discarded = 1 + self.queue.drain().len();
                debug!(discarded, "session ended; discarding queued client frames");
                break;
            }

            if !self.session.is_ready() && !self.session.wait_ready(self.timing.ready_wait).await {
                if self.session.is_live() {
                    trace!("upstream not ready; re-queueing client frame");
                    self.requeue.push(pending);
                }
                continue;
            }

            match self.session.send_upstream(pending.frame.as_str()).await {
                Ok(()) => {
                    trace!(id = ?pending.frame.id(), "relayed client frame upstream");
                }
                Err(e) => {
                    pending.attempts = pending.attempts.saturating_add(1);
                    let cap = self.timing.send_max_attempts;
                    if cap > 0 && pending.attempts >= cap {
                        warn!(
                            error = %e,
                            attempts = pending.attempts,
                            "giving up on client frame"
                        );
                        continue;
                    }
                    warn!(error = %e, attempts = pending.attempts, "upstream send failed; retrying");
                    self.requeue.push(pending);
                    tokio::time::sleep(self.timing.send_backoff).await;
                }
            }
        }
        trace!("inbound sender stopped");
    }
}
