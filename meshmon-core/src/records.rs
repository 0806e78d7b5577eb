//! Mesh records: packets, nodes, neighbor observations and telemetry
//!
//! Two shapes exist for the ingested records:
//! - `*Ingest` types are the wire shape the bridge POSTs to the server.
//!   Every field is optional or defaulted so partial upstream data still
//!   decodes.
//! - The persisted types carry the store-assigned id and resolved timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CoreError, LOCAL_NODE, UNKNOWN_KIND};

fn unknown_kind() -> String {
    UNKNOWN_KIND.to_string()
}

fn local_node() -> String {
    LOCAL_NODE.to_string()
}

/// A packet as submitted to `POST /ingest/packets`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketIngest {
    /// Fingerprint used for deduplication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet_hash: Option<String>,
    /// e.g. `ADVERT`, `TXT_MSG`, `ACK`, `TRACE`
    #[serde(default = "unknown_kind")]
    pub packet_type: String,
    /// `FLOOD` or `DIRECT`
    #[serde(default = "unknown_kind")]
    pub route_type: String,
    /// JSON-encoded list of hop prefixes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hop_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rssi: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snr: Option<f64>,
    /// Originator node prefix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_hash: Option<String>,
    /// Hex-encoded payload bytes (encrypted for most message types)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_hex: Option<String>,
    /// Original upstream JSON blob, kept for later parsing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_json: Option<String>,
    /// RFC 3339 capture time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<String>,

    /// Advertised node name, merged into the source node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Advertised node type, merged into the source node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

impl Default for PacketIngest {
    fn default() -> Self {
        Self {
            packet_hash: None,
            packet_type: unknown_kind(),
            route_type: unknown_kind(),
            path: None,
            hop_count: None,
            rssi: None,
            snr: None,
            source_hash: None,
            dest_hash: None,
            payload_hex: None,
            raw_json: None,
            received_at: None,
            name: None,
            node_type: None,
            lat: None,
            lon: None,
        }
    }
}

impl PacketIngest {
    /// Resolve the capture timestamp, falling back to `now` when absent
    /// or unparsable.
    pub fn received_at_or(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.received_at
            .as_deref()
            .and_then(|raw| parse_timestamp(raw).ok())
            .unwrap_or(now)
    }

    /// Node fields carried by this packet, applied to its source node
    pub fn node_update(&self) -> NodeUpdate {
        NodeUpdate {
            name: self.name.clone(),
            node_type: self.node_type.clone(),
            lat: self.lat,
            lon: self.lon,
            rssi: self.rssi,
            snr: self.snr,
        }
    }
}

/// Parse an RFC 3339 timestamp, accepting naive timestamps as UTC
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, CoreError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| CoreError::Timestamp(raw.to_string()))
}

/// A persisted packet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    pub id: i64,
    pub received_at: DateTime<Utc>,
    pub packet_hash: Option<String>,
    pub packet_type: String,
    pub route_type: String,
    pub payload_hex: Option<String>,
    pub path: Option<String>,
    pub hop_count: Option<u32>,
    pub rssi: Option<i32>,
    pub snr: Option<f64>,
    pub source_hash: Option<String>,
    pub dest_hash: Option<String>,
    pub raw_json: Option<String>,
}

/// A mesh node identified by its short hex prefix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: i64,
    /// 2-char hex prefix extracted from packet paths
    pub node_hash: String,
    /// Full public key when seen in an advert
    pub public_key: Option<String>,
    pub name: Option<String>,
    /// One of `repeater`, `companion`, `room_server`
    pub node_type: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub last_rssi: Option<i32>,
    pub last_snr: Option<f64>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// True for the monitored repeater itself
    pub is_local: bool,
}

/// Fields an observation may contribute to a node.
///
/// `None` never clears a stored value. Empty strings are treated as absent
/// for `name` and `node_type`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeUpdate {
    pub name: Option<String>,
    pub node_type: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub rssi: Option<i32>,
    pub snr: Option<f64>,
}

impl Node {
    /// A node seen for the first time
    pub fn new(node_hash: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            node_hash: node_hash.to_string(),
            public_key: None,
            name: None,
            node_type: None,
            lat: None,
            lon: None,
            last_rssi: None,
            last_snr: None,
            first_seen: now,
            last_seen: now,
            is_local: false,
        }
    }

    /// Merge an observation into this node
    pub fn merge(&mut self, update: &NodeUpdate, now: DateTime<Utc>) {
        self.last_seen = now;
        if update.rssi.is_some() {
            self.last_rssi = update.rssi;
        }
        if update.snr.is_some() {
            self.last_snr = update.snr;
        }
        if let Some(name) = update.name.as_deref().filter(|n| !n.is_empty()) {
            self.name = Some(name.to_string());
        }
        if let Some(node_type) = update.node_type.as_deref().filter(|t| !t.is_empty()) {
            self.node_type = Some(node_type.to_string());
        }
        if update.lat.is_some() {
            self.lat = update.lat;
        }
        if update.lon.is_some() {
            self.lon = update.lon;
        }
    }
}

/// A neighbor observation as submitted to `POST /ingest/neighbors`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborIngest {
    /// Observing node
    #[serde(default = "local_node")]
    pub node_hash: String,
    /// Observed neighbor prefix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighbor_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rssi: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snr: Option<f64>,
    /// Alternative name for `neighbor_hash` used by some repeater builds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

impl NeighborIngest {
    /// The observed node, from either field name. Empty values count as absent.
    pub fn observed(&self) -> Option<&str> {
        self.neighbor_hash
            .as_deref()
            .filter(|h| !h.is_empty())
            .or_else(|| self.hash.as_deref().filter(|h| !h.is_empty()))
    }

    /// Node fields carried by this observation, applied to the observed node
    pub fn node_update(&self) -> NodeUpdate {
        NodeUpdate {
            name: self.name.clone(),
            node_type: self.node_type.clone(),
            lat: self.lat,
            lon: self.lon,
            rssi: self.rssi,
            snr: self.snr,
        }
    }
}

/// A directional neighbor observation (node A heard node B)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub id: i64,
    pub observed_at: DateTime<Utc>,
    pub node_hash: String,
    pub neighbor_hash: String,
    pub rssi: Option<i32>,
    pub snr: Option<f64>,
    /// Always 1 on insert; repeated edges are appended as new rows
    pub observation_count: u32,
}

/// Time-series telemetry snapshot for a single node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    #[serde(default)]
    pub id: i64,
    pub node_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
    pub battery_pct: Option<f64>,
    pub voltage: Option<f64>,
    /// Ambient temperature (°C)
    pub temperature: Option<f64>,
    /// Relative humidity (%)
    pub humidity: Option<f64>,
    /// Barometric pressure (hPa)
    pub pressure: Option<f64>,
    pub uptime_seconds: Option<i64>,
    pub tx_count: Option<i64>,
    pub rx_count: Option<i64>,
    pub raw_json: Option<String>,
}
