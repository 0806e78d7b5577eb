//! Ingest processor
//!
//! Persists one batch inside a single store session, then fans the newly
//! saved records out to live subscribers and the rule queue. Nothing is
//! broadcast or queued unless the session committed.

use chrono::Utc;
use tracing::info;

use meshmon_bot::EventSender;
use meshmon_core::{Event, NeighborIngest, PacketIngest};
use meshmon_store::{Store, StoreError};

use crate::hub::BroadcastHub;

#[derive(Clone)]
pub struct IngestProcessor {
    store: Store,
    hub: BroadcastHub,
    events: Option<EventSender>,
}

impl IngestProcessor {
    pub fn new(store: Store, hub: BroadcastHub, events: Option<EventSender>) -> Self {
        Self { store, hub, events }
    }

    /// Persist new packets and upsert their source nodes.
    ///
    /// Packets whose `packet_hash` is already stored are skipped. Returns
    /// the number saved.
    pub fn ingest_packets(&self, packets: &[PacketIngest]) -> Result<usize, StoreError> {
        let now = Utc::now();
        let saved = self.store.session(|s| {
            let mut saved = Vec::new();
            for pkt in packets {
                if let Some(hash) = pkt.packet_hash.as_deref() {
                    if s.packet_exists(hash)? {
                        continue;
                    }
                }

                let packet = s.insert_packet(pkt, now)?;
                if let Some(source) = pkt.source_hash.as_deref().filter(|h| !h.is_empty()) {
                    s.upsert_node(source, &pkt.node_update(), now)?;
                }
                saved.push(packet);
            }
            Ok(saved)
        })?;

        for packet in &saved {
            let event = Event::packet(packet);
            self.hub.broadcast(&event);
            if let Some(events) = &self.events {
                events.send(event);
            }
        }

        info!(saved = saved.len(), "Ingested new packets");
        Ok(saved.len())
    }

    /// Append neighbor observations and upsert each observed node.
    ///
    /// Rows naming no neighbor are skipped. One `neighbors_updated` event is
    /// broadcast per batch. Returns the number of rows stored.
    pub fn ingest_neighbors(&self, neighbors: &[NeighborIngest]) -> Result<usize, StoreError> {
        let now = Utc::now();
        let stored = self.store.session(|s| {
            let mut stored = 0;
            for nbr in neighbors {
                let Some(observed) = nbr.observed() else {
                    continue;
                };
                s.insert_neighbor(nbr, observed, now)?;
                s.upsert_node(observed, &nbr.node_update(), now)?;
                stored += 1;
            }
            Ok(stored)
        })?;

        self.hub.broadcast(&Event::neighbors_updated());
        info!(stored, "Ingested neighbor observations");
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshmon_bot::{event_queue, Recv};
    use serde_json::Value;
    use std::time::Duration;

    fn packet(hash: &str, source: &str, name: Option<&str>) -> PacketIngest {
        PacketIngest {
            packet_hash: Some(hash.to_string()),
            packet_type: "ADVERT".to_string(),
            source_hash: Some(source.to_string()),
            name: name.map(str::to_string),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_events_follow_persistence_order() {
        let store = Store::open_in_memory().unwrap();
        let hub = BroadcastHub::new();
        let (tx, mut rx) = event_queue();
        let processor = IngestProcessor::new(store, hub.clone(), Some(tx));
        let (_id, mut live) = hub.register();

        let saved = processor
            .ingest_packets(&[packet("a", "FA", None), packet("b", "79", None), packet("a", "FA", None)])
            .unwrap();
        assert_eq!(saved, 2);

        for expected in ["a", "b"] {
            let text = live.recv().await.unwrap();
            let json: Value = serde_json::from_str(&text).unwrap();
            assert_eq!(json["type"], "packet");
            assert_eq!(json["data"]["packet_hash"], expected);

            match rx.recv_timeout(Duration::from_secs(1)).await {
                Recv::Event(event) => assert_eq!(event.field("packet_hash"), Some(expected)),
                other => panic!("expected queued event, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_later_name_wins() {
        let store = Store::open_in_memory().unwrap();
        let processor = IngestProcessor::new(store.clone(), BroadcastHub::new(), None);

        processor.ingest_packets(&[packet("a", "FA", Some("Alpha"))]).unwrap();
        processor.ingest_packets(&[packet("b", "FA", Some("Bravo"))]).unwrap();
        processor.ingest_packets(&[packet("c", "FA", None)]).unwrap();

        let node = store.session(|s| s.find_node("FA")).unwrap().unwrap();
        assert_eq!(node.name.as_deref(), Some("Bravo"));
    }

    #[tokio::test]
    async fn test_neighbor_batch() {
        let store = Store::open_in_memory().unwrap();
        let hub = BroadcastHub::new();
        let (tx, mut rx) = event_queue();
        let processor = IngestProcessor::new(store.clone(), hub.clone(), Some(tx));
        let (_id, mut live) = hub.register();

        let batch: Vec<NeighborIngest> = serde_json::from_str(
            r#"[{"neighbor_hash":"DD","rssi":-80},{"hash":"EE","snr":4.5},{"rssi":-90}]"#,
        )
        .unwrap();
        assert_eq!(processor.ingest_neighbors(&batch).unwrap(), 2);

        let text = live.recv().await.unwrap();
        assert_eq!(text, r#"{"type":"neighbors_updated","data":{}}"#);
        assert!(live.try_recv().is_err());

        assert!(matches!(
            rx.recv_timeout(Duration::from_millis(20)).await,
            Recv::Idle
        ));

        let dd = store.session(|s| s.find_node("DD")).unwrap().unwrap();
        assert_eq!(dd.last_rssi, Some(-80));
        assert!(store.session(|s| s.find_node("EE")).unwrap().is_some());
        assert_eq!(store.session(|s| s.list_neighbors("DD")).unwrap().len(), 1);
    }
}
