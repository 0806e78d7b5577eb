//! Normalization of raw repeater records into the ingest shape
//!
//! Repeater builds differ in which fields they populate, so every lookup is
//! lenient: missing or mistyped fields fall back to defaults rather than
//! failing the record.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::{PacketIngest, UNKNOWN_KIND};

/// Dedup key of a raw record: `hash`, else `id`.
///
/// Empty strings and nulls do not count. Numeric ids are rendered as text.
pub fn fingerprint(raw: &Value) -> Option<String> {
    ["hash", "id"].iter().find_map(|key| match raw.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn string_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_string)
}

fn int_field(raw: &Value, key: &str) -> Option<i32> {
    let value = raw.get(key)?;
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.round() as i64))
        .and_then(|v| i32::try_from(v).ok())
}

fn float_field(raw: &Value, key: &str) -> Option<f64> {
    raw.get(key).and_then(Value::as_f64)
}

/// Capture time of a raw record: RFC 3339 strings pass through, numbers are
/// read as Unix seconds, anything else falls back to `now`.
fn timestamp_field(raw: &Value, now: DateTime<Utc>) -> String {
    match raw.get("timestamp") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n
            .as_f64()
            .and_then(|secs| DateTime::from_timestamp_millis((secs * 1000.0) as i64))
            .unwrap_or(now)
            .to_rfc3339_opts(SecondsFormat::Micros, false),
        _ => now.to_rfc3339_opts(SecondsFormat::Micros, false),
    }
}

/// Transform a raw repeater packet into the ingest schema.
///
/// - `hop_count` is the length of `path`
/// - `source_hash` falls back to the first hop when `source` is absent
/// - `received_at` falls back to `now` when `timestamp` is absent
pub fn normalize_packet(raw: &Value, now: DateTime<Utc>) -> PacketIngest {
    let path: Vec<String> = raw
        .get("path")
        .and_then(Value::as_array)
        .map(|hops| {
            hops.iter()
                .map(|hop| match hop {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    let source_hash = string_field(raw, "source").or_else(|| path.first().cloned());

    PacketIngest {
        packet_hash: fingerprint(raw),
        packet_type: string_field(raw, "type").unwrap_or_else(|| UNKNOWN_KIND.to_string()),
        route_type: string_field(raw, "route_type").unwrap_or_else(|| UNKNOWN_KIND.to_string()),
        path: Some(serde_json::to_string(&path).unwrap_or_else(|_| "[]".to_string())),
        hop_count: Some(path.len() as u32),
        rssi: int_field(raw, "rssi"),
        snr: float_field(raw, "snr"),
        source_hash,
        dest_hash: string_field(raw, "destination"),
        payload_hex: string_field(raw, "payload_hex"),
        raw_json: Some(raw.to_string()),
        received_at: Some(timestamp_field(raw, now)),
        name: string_field(raw, "name"),
        node_type: string_field(raw, "node_type"),
        lat: float_field(raw, "lat"),
        lon: float_field(raw, "lon"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fingerprint_prefers_hash() {
        assert_eq!(fingerprint(&json!({"hash": "aa", "id": 3})), Some("aa".to_string()));
        assert_eq!(fingerprint(&json!({"hash": "", "id": 3})), Some("3".to_string()));
        assert_eq!(fingerprint(&json!({"id": "x1"})), Some("x1".to_string()));
        assert_eq!(fingerprint(&json!({"type": "ACK"})), None);
    }

    #[test]
    fn test_normalize_full_record() {
        let raw = json!({
            "hash": "abc123",
            "type": "ADVERT",
            "route_type": "FLOOD",
            "path": ["FA", "79"],
            "rssi": -85,
            "snr": 7.5,
            "source": "FA",
            "destination": "79",
            "payload_hex": "70696e67",
            "timestamp": "2025-03-01T12:00:00+00:00"
        });

        let pkt = normalize_packet(&raw, Utc::now());
        assert_eq!(pkt.packet_hash.as_deref(), Some("abc123"));
        assert_eq!(pkt.packet_type, "ADVERT");
        assert_eq!(pkt.path.as_deref(), Some(r#"["FA","79"]"#));
        assert_eq!(pkt.hop_count, Some(2));
        assert_eq!(pkt.rssi, Some(-85));
        assert_eq!(pkt.dest_hash.as_deref(), Some("79"));
        assert_eq!(pkt.received_at.as_deref(), Some("2025-03-01T12:00:00+00:00"));

        let round_trip: Value = serde_json::from_str(pkt.raw_json.as_deref().unwrap()).unwrap();
        assert_eq!(round_trip, raw);
    }

    #[test]
    fn test_normalize_fallbacks() {
        let now = Utc::now();
        let pkt = normalize_packet(&json!({"path": ["C3", "D4", "E5"]}), now);

        assert_eq!(pkt.packet_hash, None);
        assert_eq!(pkt.packet_type, "UNKNOWN");
        assert_eq!(pkt.route_type, "UNKNOWN");
        assert_eq!(pkt.source_hash.as_deref(), Some("C3"));
        assert_eq!(pkt.hop_count, Some(3));
        assert_eq!(pkt.received_at_or(Utc::now()).timestamp(), now.timestamp());
    }

    #[test]
    fn test_normalize_empty_path() {
        let pkt = normalize_packet(&json!({"hash": "z"}), Utc::now());
        assert_eq!(pkt.path.as_deref(), Some("[]"));
        assert_eq!(pkt.hop_count, Some(0));
        assert_eq!(pkt.source_hash, None);
    }

    #[test]
    fn test_numeric_timestamp() {
        let pkt = normalize_packet(&json!({"timestamp": 1740830400}), Utc::now());
        let ts = pkt.received_at_or(Utc::now());
        assert_eq!(ts.timestamp(), 1740830400);
    }
}
