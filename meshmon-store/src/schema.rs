//! Table definitions
//!
//! All statements use `IF NOT EXISTS` so schema creation is idempotent.

pub(crate) const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS nodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    node_hash TEXT NOT NULL UNIQUE,
    public_key TEXT,
    name TEXT,
    node_type TEXT,
    lat REAL,
    lon REAL,
    last_rssi INTEGER,
    last_snr REAL,
    first_seen TEXT NOT NULL,
    last_seen TEXT NOT NULL,
    is_local INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_nodes_last_seen ON nodes(last_seen DESC);

CREATE TABLE IF NOT EXISTS packets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    received_at TEXT NOT NULL,
    packet_hash TEXT,
    packet_type TEXT NOT NULL DEFAULT 'UNKNOWN',
    route_type TEXT NOT NULL DEFAULT 'UNKNOWN',
    payload_hex TEXT,
    path TEXT,
    hop_count INTEGER,
    rssi INTEGER,
    snr REAL,
    source_hash TEXT,
    dest_hash TEXT,
    raw_json TEXT
);
CREATE INDEX IF NOT EXISTS idx_packets_hash ON packets(packet_hash);
CREATE INDEX IF NOT EXISTS idx_packets_source ON packets(source_hash);
CREATE INDEX IF NOT EXISTS idx_packets_received ON packets(received_at DESC);

CREATE TABLE IF NOT EXISTS telemetry (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    node_hash TEXT NOT NULL,
    recorded_at TEXT NOT NULL,
    battery_pct REAL,
    voltage REAL,
    temperature REAL,
    humidity REAL,
    pressure REAL,
    uptime_seconds INTEGER,
    tx_count INTEGER,
    rx_count INTEGER,
    raw_json TEXT
);
CREATE INDEX IF NOT EXISTS idx_telemetry_node ON telemetry(node_hash, recorded_at DESC);

CREATE TABLE IF NOT EXISTS neighbors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    observed_at TEXT NOT NULL,
    node_hash TEXT NOT NULL,
    neighbor_hash TEXT NOT NULL,
    rssi INTEGER,
    snr REAL,
    observation_count INTEGER NOT NULL DEFAULT 1
);
CREATE INDEX IF NOT EXISTS idx_neighbors_node ON neighbors(node_hash);
CREATE INDEX IF NOT EXISTS idx_neighbors_neighbor ON neighbors(neighbor_hash);

CREATE TABLE IF NOT EXISTS bot_rules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    enabled INTEGER NOT NULL DEFAULT 1,
    trigger_type TEXT NOT NULL,
    trigger_value TEXT NOT NULL,
    action_type TEXT NOT NULL,
    action_config TEXT NOT NULL DEFAULT '{}',
    last_triggered TEXT,
    trigger_count INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_bot_rules_name ON bot_rules(name);
";
