//! Operations available inside a scoped store session
//!
//! A [`Session`] wraps one SQLite transaction. Everything done through it
//! commits together when the session closure returns `Ok`, and rolls back
//! when it returns `Err` or unwinds.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row, Transaction};

use meshmon_core::{
    BotRule, NeighborIngest, Neighbor, NewBotRule, Node, NodeUpdate, Packet, PacketIngest,
    Telemetry,
};

use crate::StoreError;

/// Filters for packet listing
#[derive(Debug, Clone)]
pub struct PacketFilter {
    pub limit: u32,
    pub packet_type: Option<String>,
    pub source_hash: Option<String>,
    pub packet_hash: Option<String>,
}

impl Default for PacketFilter {
    fn default() -> Self {
        Self {
            limit: 100,
            packet_type: None,
            source_hash: None,
            packet_hash: None,
        }
    }
}

/// A transactional handle on the store
pub struct Session<'c> {
    pub(crate) tx: Transaction<'c>,
}

const NODE_COLUMNS: &str = "id, node_hash, public_key, name, node_type, lat, lon, \
     last_rssi, last_snr, first_seen, last_seen, is_local";

const PACKET_COLUMNS: &str = "id, received_at, packet_hash, packet_type, route_type, \
     payload_hex, path, hop_count, rssi, snr, source_hash, dest_hash, raw_json";

const RULE_COLUMNS: &str = "id, name, enabled, trigger_type, trigger_value, action_type, \
     action_config, last_triggered, trigger_count";

const TELEMETRY_COLUMNS: &str = "id, node_hash, recorded_at, battery_pct, voltage, \
     temperature, humidity, pressure, uptime_seconds, tx_count, rx_count, raw_json";

fn node_from_row(row: &Row<'_>) -> rusqlite::Result<Node> {
    Ok(Node {
        id: row.get(0)?,
        node_hash: row.get(1)?,
        public_key: row.get(2)?,
        name: row.get(3)?,
        node_type: row.get(4)?,
        lat: row.get(5)?,
        lon: row.get(6)?,
        last_rssi: row.get(7)?,
        last_snr: row.get(8)?,
        first_seen: row.get(9)?,
        last_seen: row.get(10)?,
        is_local: row.get(11)?,
    })
}

fn packet_from_row(row: &Row<'_>) -> rusqlite::Result<Packet> {
    Ok(Packet {
        id: row.get(0)?,
        received_at: row.get(1)?,
        packet_hash: row.get(2)?,
        packet_type: row.get(3)?,
        route_type: row.get(4)?,
        payload_hex: row.get(5)?,
        path: row.get(6)?,
        hop_count: row.get(7)?,
        rssi: row.get(8)?,
        snr: row.get(9)?,
        source_hash: row.get(10)?,
        dest_hash: row.get(11)?,
        raw_json: row.get(12)?,
    })
}

fn rule_from_row(row: &Row<'_>) -> rusqlite::Result<BotRule> {
    Ok(BotRule {
        id: row.get(0)?,
        name: row.get(1)?,
        enabled: row.get(2)?,
        trigger_type: row.get(3)?,
        trigger_value: row.get(4)?,
        action_type: row.get(5)?,
        action_config: row.get(6)?,
        last_triggered: row.get(7)?,
        trigger_count: row.get(8)?,
    })
}

fn telemetry_from_row(row: &Row<'_>) -> rusqlite::Result<Telemetry> {
    Ok(Telemetry {
        id: row.get(0)?,
        node_hash: row.get(1)?,
        recorded_at: row.get(2)?,
        battery_pct: row.get(3)?,
        voltage: row.get(4)?,
        temperature: row.get(5)?,
        humidity: row.get(6)?,
        pressure: row.get(7)?,
        uptime_seconds: row.get(8)?,
        tx_count: row.get(9)?,
        rx_count: row.get(10)?,
        raw_json: row.get(11)?,
    })
}

fn neighbor_from_row(row: &Row<'_>) -> rusqlite::Result<Neighbor> {
    Ok(Neighbor {
        id: row.get(0)?,
        observed_at: row.get(1)?,
        node_hash: row.get(2)?,
        neighbor_hash: row.get(3)?,
        rssi: row.get(4)?,
        snr: row.get(5)?,
        observation_count: row.get(6)?,
    })
}

impl Session<'_> {
    // -- packets ---------------------------------------------------------

    /// True if a packet with this fingerprint is already stored
    pub fn packet_exists(&self, packet_hash: &str) -> Result<bool, StoreError> {
        let found = self
            .tx
            .query_row(
                "SELECT 1 FROM packets WHERE packet_hash = ?1 LIMIT 1",
                params![packet_hash],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Persist a packet as a new row
    pub fn insert_packet(
        &self,
        pkt: &PacketIngest,
        now: DateTime<Utc>,
    ) -> Result<Packet, StoreError> {
        let received_at = pkt.received_at_or(now);
        self.tx.execute(
            "INSERT INTO packets (received_at, packet_hash, packet_type, route_type, payload_hex,
                                  path, hop_count, rssi, snr, source_hash, dest_hash, raw_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                received_at,
                pkt.packet_hash,
                pkt.packet_type,
                pkt.route_type,
                pkt.payload_hex,
                pkt.path,
                pkt.hop_count,
                pkt.rssi,
                pkt.snr,
                pkt.source_hash,
                pkt.dest_hash,
                pkt.raw_json,
            ],
        )?;

        Ok(Packet {
            id: self.tx.last_insert_rowid(),
            received_at,
            packet_hash: pkt.packet_hash.clone(),
            packet_type: pkt.packet_type.clone(),
            route_type: pkt.route_type.clone(),
            payload_hex: pkt.payload_hex.clone(),
            path: pkt.path.clone(),
            hop_count: pkt.hop_count,
            rssi: pkt.rssi,
            snr: pkt.snr,
            source_hash: pkt.source_hash.clone(),
            dest_hash: pkt.dest_hash.clone(),
            raw_json: pkt.raw_json.clone(),
        })
    }

    /// Packets newest first
    pub fn list_packets(&self, filter: &PacketFilter) -> Result<Vec<Packet>, StoreError> {
        let sql = format!(
            "SELECT {PACKET_COLUMNS} FROM packets
             WHERE (?1 IS NULL OR packet_type = ?1)
               AND (?2 IS NULL OR source_hash = ?2)
               AND (?3 IS NULL OR packet_hash = ?3)
             ORDER BY received_at DESC, id DESC
             LIMIT ?4"
        );
        let mut stmt = self.tx.prepare(&sql)?;
        let rows = stmt.query_map(
            params![
                filter.packet_type,
                filter.source_hash,
                filter.packet_hash,
                filter.limit
            ],
            packet_from_row,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // -- nodes -----------------------------------------------------------

    pub fn find_node(&self, node_hash: &str) -> Result<Option<Node>, StoreError> {
        let sql = format!("SELECT {NODE_COLUMNS} FROM nodes WHERE node_hash = ?1");
        Ok(self
            .tx
            .query_row(&sql, params![node_hash], node_from_row)
            .optional()?)
    }

    /// Create the node on first reference, else merge non-null fields
    pub fn upsert_node(
        &self,
        node_hash: &str,
        update: &NodeUpdate,
        now: DateTime<Utc>,
    ) -> Result<Node, StoreError> {
        let mut node = self
            .find_node(node_hash)?
            .unwrap_or_else(|| Node::new(node_hash, now));
        node.merge(update, now);

        if node.id == 0 {
            self.tx.execute(
                "INSERT INTO nodes (node_hash, public_key, name, node_type, lat, lon,
                                    last_rssi, last_snr, first_seen, last_seen, is_local)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    node.node_hash,
                    node.public_key,
                    node.name,
                    node.node_type,
                    node.lat,
                    node.lon,
                    node.last_rssi,
                    node.last_snr,
                    node.first_seen,
                    node.last_seen,
                    node.is_local,
                ],
            )?;
            node.id = self.tx.last_insert_rowid();
        } else {
            self.tx.execute(
                "UPDATE nodes SET name = ?2, node_type = ?3, lat = ?4, lon = ?5,
                                  last_rssi = ?6, last_snr = ?7, last_seen = ?8
                 WHERE id = ?1",
                params![
                    node.id,
                    node.name,
                    node.node_type,
                    node.lat,
                    node.lon,
                    node.last_rssi,
                    node.last_snr,
                    node.last_seen,
                ],
            )?;
        }
        Ok(node)
    }

    /// Nodes ordered by most recently seen
    pub fn list_nodes(&self, limit: u32) -> Result<Vec<Node>, StoreError> {
        let sql = format!(
            "SELECT {NODE_COLUMNS} FROM nodes ORDER BY last_seen DESC, id DESC LIMIT ?1"
        );
        let mut stmt = self.tx.prepare(&sql)?;
        let rows = stmt.query_map(params![limit], node_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // -- neighbors -------------------------------------------------------

    /// Append a neighbor observation. Existing edges are not merged.
    pub fn insert_neighbor(
        &self,
        nbr: &NeighborIngest,
        neighbor_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Neighbor, StoreError> {
        self.tx.execute(
            "INSERT INTO neighbors (observed_at, node_hash, neighbor_hash, rssi, snr, observation_count)
             VALUES (?1, ?2, ?3, ?4, ?5, 1)",
            params![now, nbr.node_hash, neighbor_hash, nbr.rssi, nbr.snr],
        )?;
        Ok(Neighbor {
            id: self.tx.last_insert_rowid(),
            observed_at: now,
            node_hash: nbr.node_hash.clone(),
            neighbor_hash: neighbor_hash.to_string(),
            rssi: nbr.rssi,
            snr: nbr.snr,
            observation_count: 1,
        })
    }

    /// Neighbor rows for an observed node, newest first
    pub fn list_neighbors(&self, neighbor_hash: &str) -> Result<Vec<Neighbor>, StoreError> {
        let mut stmt = self.tx.prepare(
            "SELECT id, observed_at, node_hash, neighbor_hash, rssi, snr, observation_count
             FROM neighbors WHERE neighbor_hash = ?1 ORDER BY id DESC",
        )?;
        let rows = stmt.query_map(params![neighbor_hash], neighbor_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // -- telemetry -------------------------------------------------------

    pub fn insert_telemetry(
        &self,
        snapshot: &Telemetry,
        now: DateTime<Utc>,
    ) -> Result<Telemetry, StoreError> {
        let recorded_at = snapshot.recorded_at.unwrap_or(now);
        self.tx.execute(
            "INSERT INTO telemetry (node_hash, recorded_at, battery_pct, voltage, temperature,
                                    humidity, pressure, uptime_seconds, tx_count, rx_count, raw_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                snapshot.node_hash,
                recorded_at,
                snapshot.battery_pct,
                snapshot.voltage,
                snapshot.temperature,
                snapshot.humidity,
                snapshot.pressure,
                snapshot.uptime_seconds,
                snapshot.tx_count,
                snapshot.rx_count,
                snapshot.raw_json,
            ],
        )?;
        Ok(Telemetry {
            id: self.tx.last_insert_rowid(),
            recorded_at: Some(recorded_at),
            ..snapshot.clone()
        })
    }

    /// Telemetry snapshots newest first, optionally for one node
    pub fn list_telemetry(
        &self,
        node_hash: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Telemetry>, StoreError> {
        let sql = format!(
            "SELECT {TELEMETRY_COLUMNS} FROM telemetry
             WHERE (?1 IS NULL OR node_hash = ?1)
             ORDER BY recorded_at DESC, id DESC LIMIT ?2"
        );
        let mut stmt = self.tx.prepare(&sql)?;
        let rows = stmt.query_map(params![node_hash, limit], telemetry_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // -- bot rules -------------------------------------------------------

    /// All rules in id order, or only the enabled ones
    pub fn list_rules(&self, enabled_only: bool) -> Result<Vec<BotRule>, StoreError> {
        let sql = format!(
            "SELECT {RULE_COLUMNS} FROM bot_rules WHERE (?1 = 0 OR enabled = 1) ORDER BY id"
        );
        let mut stmt = self.tx.prepare(&sql)?;
        let rows = stmt.query_map(params![enabled_only], rule_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get_rule(&self, id: i64) -> Result<Option<BotRule>, StoreError> {
        let sql = format!("SELECT {RULE_COLUMNS} FROM bot_rules WHERE id = ?1");
        Ok(self.tx.query_row(&sql, params![id], rule_from_row).optional()?)
    }

    pub fn find_rule_by_name(&self, name: &str) -> Result<Option<BotRule>, StoreError> {
        let sql = format!("SELECT {RULE_COLUMNS} FROM bot_rules WHERE name = ?1 LIMIT 1");
        Ok(self.tx.query_row(&sql, params![name], rule_from_row).optional()?)
    }

    pub fn create_rule(&self, body: &NewBotRule) -> Result<BotRule, StoreError> {
        self.tx.execute(
            "INSERT INTO bot_rules (name, enabled, trigger_type, trigger_value, action_type, action_config)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                body.name,
                body.enabled,
                body.trigger_type,
                body.trigger_value,
                body.action_type,
                body.action_config,
            ],
        )?;
        let id = self.tx.last_insert_rowid();
        self.get_rule(id)?
            .ok_or_else(|| StoreError::NotFound(format!("rule {id}")))
    }

    /// Persist every column of a rule, statistics included
    pub fn save_rule(&self, rule: &BotRule) -> Result<(), StoreError> {
        let changed = self.tx.execute(
            "UPDATE bot_rules SET name = ?2, enabled = ?3, trigger_type = ?4, trigger_value = ?5,
                                  action_type = ?6, action_config = ?7, last_triggered = ?8,
                                  trigger_count = ?9
             WHERE id = ?1",
            params![
                rule.id,
                rule.name,
                rule.enabled,
                rule.trigger_type,
                rule.trigger_value,
                rule.action_type,
                rule.action_config,
                rule.last_triggered,
                rule.trigger_count,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("rule {}", rule.id)));
        }
        Ok(())
    }

    /// Returns false if no such rule exists
    pub fn delete_rule(&self, id: i64) -> Result<bool, StoreError> {
        let changed = self
            .tx
            .execute("DELETE FROM bot_rules WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}
