//! Ordered relay queues between the session tasks.
//!
//! Each direction gets one unbounded FIFO. Insertion order is delivery
//! order; nothing is reordered or prioritised. Re-queueing appends at the
//! tail.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::domain::Frame;

/// Creates a connected sender/receiver pair.
#[must_use]
pub fn relay_queue<T>() -> (RelaySender<T>, RelayReceiver<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (RelaySender { tx }, RelayReceiver { rx })
}

/// Producer half; cheap to clone.
#[derive(Debug)]
pub struct RelaySender<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for RelaySender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> RelaySender<T> {
    /// Appends an item. Never blocks; returns `false` once the receiver
    /// is gone.
    pub fn push(&self, item: T) -> bool {
        self.tx.send(item).is_ok()
    }
}

/// Result of a bounded receive.
#[derive(Debug, PartialEq)]
pub enum Recv<T> {
    /// An item was dequeued.
    Item(T),
    /// Nothing arrived in time.
    Timeout,
    /// Every sender is gone and the queue is empty.
    Closed,
}

/// Consumer half.
#[derive(Debug)]
pub struct RelayReceiver<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> RelayReceiver<T> {
    /// Waits for the next item.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Waits at most `limit` for the next item.
    pub async fn recv_timeout(&mut self, limit: Duration) -> Recv<T> {
        match tokio::time::timeout(limit, self.rx.recv()).await {
            Ok(Some(item)) => Recv::Item(item),
            Ok(None) => Recv::Closed,
            Err(_) => Recv::Timeout,
        }
    }

    /// Takes everything currently queued, in order, without waiting.
    pub fn drain(&mut self) -> Vec<T> {
        let mut items = Vec::new();
        while let Ok(item) = self.rx.try_recv() {
            items.push(item);
        }
        items
    }
}

/// A client frame waiting to be written upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingFrame {
    /// The frame, relayed verbatim.
    pub frame: Frame,
    /// Failed send attempts so far.
    pub attempts: u32,
}

impl PendingFrame {
    /// Wraps a fresh frame.
    #[must_use]
    pub const fn new(frame: Frame) -> Self {
        Self { frame, attempts: 0 }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn frame(n: u64) -> Frame {
        let Ok(frame) = Frame::parse(format!(r#"{{"id":{n},"type":"event"}}"#)) else {
            panic!("bad test frame");
        };
        frame
    }

    #[test]
    fn drain_preserves_insertion_order() {
        let (tx, mut rx) = relay_queue();
        for n in 1..=3 {
            assert!(tx.push(frame(n)));
        }
        let ids: Vec<Option<u64>> = rx.drain().iter().map(Frame::id).collect();
        assert_eq!(ids, vec![Some(1), Some(2), Some(3)]);
        assert!(rx.drain().is_empty());
    }

    #[tokio::test]
    async fn recv_preserves_insertion_order() {
        let (tx, mut rx) = relay_queue();
        tx.push(frame(1));
        tx.push(frame(2));
        tx.push(frame(3));
        for expected in 1..=3 {
            let Some(f) = rx.recv().await else {
                panic!("queue ended early");
            };
            assert_eq!(f.id(), Some(expected));
        }
    }

    #[tokio::test]
    async fn requeue_goes_to_tail() {
        let (tx, mut rx) = relay_queue();
        tx.push(PendingFrame::new(frame(1)));
        tx.push(PendingFrame::new(frame(2)));
        let Recv::Item(mut first) = rx.recv_timeout(Duration::from_millis(10)).await else {
            panic!("expected an item");
        };
        first.attempts += 1;
        tx.push(first);
        let order: Vec<(Option<u64>, u32)> = rx
            .drain()
            .into_iter()
            .map(|p| (p.frame.id(), p.attempts))
            .collect();
        assert_eq!(order, vec![(Some(2), 0), (Some(1), 1)]);
    }

    #[tokio::test]
    async fn recv_timeout_on_empty_queue() {
        let (_tx, mut rx) = relay_queue::<Frame>();
        assert_eq!(rx.recv_timeout(Duration::from_millis(5)).await, Recv::Timeout);
    }

    #[tokio::test]
    async fn closed_when_senders_dropped() {
        let (tx, mut rx) = relay_queue::<Frame>();
        drop(tx);
        assert_eq!(rx.recv_timeout(Duration::from_millis(5)).await, Recv::Closed);
    }

    #[test]
    fn push_fails_without_receiver() {
        let (tx, rx) = relay_queue::<Frame>();
        drop(rx);
        assert!(!tx.push(frame(1)));
    }
}
