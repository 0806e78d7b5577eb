//! Event queue between ingest and the rule worker
//!
//! An unbounded tokio channel: producers never wait on the consumer. The
//! consumer waits with a timeout so it can check for shutdown while idle.

use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use meshmon_core::Event;

/// Idle wait used by the rule worker
pub const QUEUE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome of one bounded wait on the queue
#[derive(Debug)]
pub enum Recv {
    Event(Event),
    /// Nothing arrived within the wait
    Idle,
    /// Every sender is gone
    Closed,
}

/// Producer handle, cloned into each request handler
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventSender {
    /// Enqueue an event. Returns false if the worker has gone away.
    pub fn send(&self, event: Event) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(e) => {
                debug!("Event queue closed, dropping {} event", e.0.kind);
                false
            }
        }
    }
}

/// Consumer side, owned by the rule worker
#[derive(Debug)]
pub struct EventQueue {
    rx: mpsc::UnboundedReceiver<Event>,
}

/// Create a connected queue pair
pub fn event_queue() -> (EventSender, EventQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, EventQueue { rx })
}

impl EventQueue {
    /// Wait up to `wait` for the next event
    pub async fn recv_timeout(&mut self, wait: Duration) -> Recv {
        match tokio::time::timeout(wait, self.rx.recv()).await {
            Ok(Some(event)) => Recv::Event(event),
            Ok(None) => Recv::Closed,
            Err(_) => Recv::Idle,
        }
    }

    /// Drop everything still queued. Returns the number discarded.
    pub fn discard_pending(&mut self) -> usize {
        self.rx.close();
        let mut discarded = 0;
        while self.rx.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshmon_core::EventKind;
    use serde_json::json;

    #[tokio::test]
    async fn test_fifo_order() {
        let (tx, mut rx) = event_queue();
        for id in 1..=3 {
            assert!(tx.send(Event::new(EventKind::Packet, json!({"id": id}))));
        }

        for id in 1..=3 {
            match rx.recv_timeout(QUEUE_POLL_INTERVAL).await {
                Recv::Event(event) => assert_eq!(event.data["id"], id),
                other => panic!("expected event, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_idle_is_not_an_error() {
        let (_tx, mut rx) = event_queue();
        assert!(matches!(
            rx.recv_timeout(Duration::from_millis(20)).await,
            Recv::Idle
        ));
    }

    #[tokio::test]
    async fn test_closed_and_discard() {
        let (tx, mut rx) = event_queue();
        tx.send(Event::neighbors_updated());
        tx.send(Event::neighbors_updated());

        assert_eq!(rx.discard_pending(), 2);
        assert!(!tx.send(Event::neighbors_updated()));

        drop(tx);
        assert!(matches!(rx.recv_timeout(QUEUE_POLL_INTERVAL).await, Recv::Closed));
    }
}
