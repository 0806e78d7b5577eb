//! Event envelopes pushed to live subscribers and the bot queue
//!
//! Every event serializes as `{"type": <kind>, "data": <object>}`. The data
//! stays an untyped JSON object so subscribers and webhooks see exactly the
//! persisted record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Packet;

/// Event classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A newly persisted packet
    Packet,
    /// A neighbor batch was stored
    NeighborsUpdated,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Packet => "packet",
            EventKind::NeighborsUpdated => "neighbors_updated",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ephemeral `{type, data}` envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub data: Value,
}

impl Event {
    pub fn new(kind: EventKind, data: Value) -> Self {
        Self { kind, data }
    }

    /// Event for a freshly persisted packet
    pub fn packet(packet: &Packet) -> Self {
        let data = serde_json::to_value(packet).unwrap_or_else(|_| Value::Object(Map::new()));
        Self::new(EventKind::Packet, data)
    }

    /// Single notification emitted after a neighbor batch
    pub fn neighbors_updated() -> Self {
        Self::new(EventKind::NeighborsUpdated, Value::Object(Map::new()))
    }

    /// String field from the event data, if present
    pub fn field(&self, name: &str) -> Option<&str> {
        self.data.get(name).and_then(Value::as_str)
    }

    /// Serialize to the wire envelope
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"type":"{}","data":{{}}}}"#, self.kind.as_str())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_packet() -> Packet {
        Packet {
            id: 7,
            received_at: Utc::now(),
            packet_hash: Some("abc123".to_string()),
            packet_type: "ADVERT".to_string(),
            route_type: "FLOOD".to_string(),
            payload_hex: None,
            path: Some(r#"["FA","79"]"#.to_string()),
            hop_count: Some(2),
            rssi: Some(-85),
            snr: Some(7.5),
            source_hash: Some("FA".to_string()),
            dest_hash: None,
            raw_json: None,
        }
    }

    #[test]
    fn test_packet_envelope_shape() {
        let event = Event::packet(&sample_packet());
        let json: Value = serde_json::from_str(&event.to_json()).unwrap();

        assert_eq!(json["type"], "packet");
        assert_eq!(json["data"]["packet_hash"], "abc123");
        assert_eq!(json["data"]["id"], 7);
        assert!(json["data"]["received_at"].is_string());
    }

    #[test]
    fn test_neighbors_updated_envelope() {
        let event = Event::neighbors_updated();
        assert_eq!(event.to_json(), r#"{"type":"neighbors_updated","data":{}}"#);
    }

    #[test]
    fn test_field_lookup() {
        let event = Event::packet(&sample_packet());
        assert_eq!(event.field("source_hash"), Some("FA"));
        assert_eq!(event.field("payload_hex"), None);
        assert_eq!(event.field("hop_count"), None);
    }
}
