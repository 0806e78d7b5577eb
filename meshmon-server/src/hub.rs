//! Broadcast hub for live-update subscribers
//!
//! Each subscriber is a bounded channel drained by its socket task. A
//! broadcast snapshots the current senders, offers the envelope to each
//! without waiting, and only then removes the ones that failed.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use meshmon_core::Event;

/// Per-subscriber queue depth. A subscriber that falls this far behind is
/// treated as dead.
pub const SUBSCRIBER_BUFFER: usize = 256;

/// Subscriber handle
pub type SubscriberId = Uuid;

#[derive(Debug, Clone, Default)]
pub struct BroadcastHub {
    subscribers: Arc<DashMap<SubscriberId, mpsc::Sender<String>>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber. The receiver yields serialized envelopes.
    pub fn register(&self) -> (SubscriberId, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let id = Uuid::new_v4();
        self.subscribers.insert(id, tx);
        info!("WebSocket connected ({} total)", self.subscribers.len());
        (id, rx)
    }

    /// Remove a subscriber. Unknown ids are ignored.
    pub fn unregister(&self, id: SubscriberId) {
        if self.subscribers.remove(&id).is_some() {
            info!("WebSocket disconnected ({} remaining)", self.subscribers.len());
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_registered(&self, id: SubscriberId) -> bool {
        self.subscribers.contains_key(&id)
    }

    /// Send `event` to every subscriber and prune the ones that failed.
    ///
    /// Returns the number of subscribers that accepted the event.
    pub fn broadcast(&self, event: &Event) -> usize {
        let message = event.to_json();
        let targets: Vec<(SubscriberId, mpsc::Sender<String>)> = self
            .subscribers
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (id, tx) in targets {
            match tx.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => dead.push(id),
            }
        }

        for id in dead {
            debug!(%id, "Pruning dead subscriber");
            self.subscribers.remove(&id);
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[tokio::test]
    async fn test_broadcast_envelope() {
        let hub = BroadcastHub::new();
        let (_id, mut rx) = hub.register();

        assert_eq!(hub.broadcast(&Event::neighbors_updated()), 1);
        let text = rx.recv().await.unwrap();
        let json: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["type"], "neighbors_updated");
        assert!(json["data"].as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_subscriber_is_pruned() {
        let hub = BroadcastHub::new();
        let (alive_a, mut rx_a) = hub.register();
        let (dead, rx_dead) = hub.register();
        let (alive_b, mut rx_b) = hub.register();
        drop(rx_dead);

        assert_eq!(hub.broadcast(&Event::neighbors_updated()), 2);
        assert!(rx_a.recv().await.is_some());
        assert!(rx_b.recv().await.is_some());

        assert!(!hub.is_registered(dead));
        assert!(hub.is_registered(alive_a));
        assert!(hub.is_registered(alive_b));
        assert_eq!(hub.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let hub = BroadcastHub::new();
        let (id, _rx) = hub.register();
        hub.unregister(id);
        hub.unregister(id);
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(hub.broadcast(&Event::neighbors_updated()), 0);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_is_dropped() {
        let hub = BroadcastHub::new();
        let (slow, _rx_slow) = hub.register();

        for _ in 0..SUBSCRIBER_BUFFER {
            hub.broadcast(&Event::neighbors_updated());
        }
        assert!(hub.is_registered(slow));

        hub.broadcast(&Event::neighbors_updated());
        assert!(!hub.is_registered(slow));
    }
}
