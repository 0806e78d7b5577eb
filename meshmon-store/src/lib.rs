//! MeshCore Monitor Store - SQLite persistence
//!
//! The store owns one connection behind a mutex. All reads and writes go
//! through [`Store::session`], which scopes a single transaction: it commits
//! when the closure returns `Ok` and rolls back otherwise. Handlers and the
//! rule worker each open their own short sessions.

pub mod error;
mod schema;
pub mod session;

pub use error::StoreError;
pub use session::{PacketFilter, Session};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use meshmon_core::{BotRule, BUILTIN_RULES};

/// Value accepted as a path for a throwaway in-memory database
pub const IN_MEMORY: &str = ":memory:";

/// Shared handle on the record database
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the database file and ensure the schema exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if path.as_os_str() == IN_MEMORY {
            return Self::open_in_memory();
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        info!(path = %path.display(), "Opened record store");
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(schema::SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` inside one transaction
    pub fn session<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Session<'_>) -> Result<T, StoreError>,
    {
        let mut conn = self.conn.lock();
        let session = Session {
            tx: conn.transaction()?,
        };
        let out = f(&session)?;
        session.tx.commit()?;
        Ok(out)
    }

    /// Insert each built-in rule whose name is not already present.
    ///
    /// Returns the number of rules inserted.
    pub fn seed_builtin_rules(&self) -> Result<usize, StoreError> {
        self.session(|s| {
            let mut seeded = 0;
            for builtin in BUILTIN_RULES {
                if s.find_rule_by_name(builtin.name)?.is_some() {
                    continue;
                }
                s.create_rule(&builtin.to_new_rule())?;
                info!(name = builtin.name, "Seeded built-in rule");
                seeded += 1;
            }
            Ok(seeded)
        })
    }

    /// Bump a rule's trigger statistics.
    ///
    /// Returns `None` if the rule was deleted after it was loaded.
    pub fn record_trigger(
        &self,
        rule_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<BotRule>, StoreError> {
        self.session(|s| {
            let Some(mut rule) = s.get_rule(rule_id)? else {
                debug!(rule_id, "Rule vanished before stats update");
                return Ok(None);
            };
            rule.record_trigger(now);
            s.save_rule(&rule)?;
            Ok(Some(rule))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshmon_core::{NeighborIngest, NewBotRule, NodeUpdate, PacketIngest, Telemetry, Trigger};

    fn store() -> Store {
        Store::open_in_memory().unwrap()
    }

    fn packet(hash: &str, kind: &str, source: &str) -> PacketIngest {
        PacketIngest {
            packet_hash: Some(hash.to_string()),
            packet_type: kind.to_string(),
            source_hash: Some(source.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_packet_insert_and_exists() {
        let store = store();
        let now = Utc::now();

        let saved = store
            .session(|s| s.insert_packet(&packet("abc123", "ADVERT", "FA"), now))
            .unwrap();
        assert!(saved.id > 0);
        assert_eq!(saved.received_at, now);

        let exists = store.session(|s| s.packet_exists("abc123")).unwrap();
        assert!(exists);
        let exists = store.session(|s| s.packet_exists("zzz")).unwrap();
        assert!(!exists);
    }

    #[test]
    fn test_list_packets_filters_and_order() {
        let store = store();
        let now = Utc::now();
        store
            .session(|s| {
                s.insert_packet(&packet("a", "ADVERT", "FA"), now)?;
                s.insert_packet(&packet("b", "TXT_MSG", "FA"), now + chrono::Duration::seconds(1))?;
                s.insert_packet(&packet("c", "ADVERT", "79"), now + chrono::Duration::seconds(2))?;
                Ok(())
            })
            .unwrap();

        let all = store
            .session(|s| s.list_packets(&PacketFilter::default()))
            .unwrap();
        let hashes: Vec<_> = all.iter().filter_map(|p| p.packet_hash.as_deref()).collect();
        assert_eq!(hashes, vec!["c", "b", "a"]);

        let adverts = store
            .session(|s| {
                s.list_packets(&PacketFilter {
                    packet_type: Some("ADVERT".to_string()),
                    ..Default::default()
                })
            })
            .unwrap();
        assert_eq!(adverts.len(), 2);

        let from_fa = store
            .session(|s| {
                s.list_packets(&PacketFilter {
                    source_hash: Some("FA".to_string()),
                    limit: 1,
                    ..Default::default()
                })
            })
            .unwrap();
        assert_eq!(from_fa.len(), 1);
        assert_eq!(from_fa[0].packet_hash.as_deref(), Some("b"));
    }

    #[test]
    fn test_failed_session_rolls_back() {
        let store = store();
        let result: Result<(), StoreError> = store.session(|s| {
            s.insert_packet(&packet("gone", "ACK", "FA"), Utc::now())?;
            Err(StoreError::NotFound("forced".to_string()))
        });
        assert!(result.is_err());
        assert!(!store.session(|s| s.packet_exists("gone")).unwrap());
    }

    #[test]
    fn test_upsert_node_merges() {
        let store = store();
        let now = Utc::now();
        let later = now + chrono::Duration::seconds(10);

        store
            .session(|s| {
                s.upsert_node(
                    "FA",
                    &NodeUpdate {
                        name: Some("Hilltop".to_string()),
                        lat: Some(52.0),
                        lon: Some(4.0),
                        ..Default::default()
                    },
                    now,
                )
            })
            .unwrap();
        let node = store
            .session(|s| {
                s.upsert_node(
                    "FA",
                    &NodeUpdate {
                        name: Some("Ridge".to_string()),
                        rssi: Some(-70),
                        ..Default::default()
                    },
                    later,
                )
            })
            .unwrap();

        assert_eq!(node.name.as_deref(), Some("Ridge"));
        assert_eq!(node.lat, Some(52.0));
        assert_eq!(node.last_rssi, Some(-70));

        let stored = store.session(|s| s.find_node("FA")).unwrap().unwrap();
        assert_eq!(stored, node);
        assert_eq!(stored.first_seen, now);
        assert_eq!(stored.last_seen, later);

        let nodes = store.session(|s| s.list_nodes(100)).unwrap();
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn test_neighbors_are_appended() {
        let store = store();
        let nbr = NeighborIngest {
            node_hash: "local".to_string(),
            neighbor_hash: Some("DD".to_string()),
            rssi: Some(-80),
            snr: None,
            hash: None,
            name: None,
            node_type: None,
            lat: None,
            lon: None,
        };

        store
            .session(|s| {
                s.insert_neighbor(&nbr, "DD", Utc::now())?;
                s.insert_neighbor(&nbr, "DD", Utc::now())?;
                Ok(())
            })
            .unwrap();

        let rows = store.session(|s| s.list_neighbors("DD")).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.observation_count == 1));
    }

    #[test]
    fn test_telemetry_listing() {
        let store = store();
        store
            .session(|s| {
                s.insert_telemetry(
                    &Telemetry {
                        node_hash: "FA".to_string(),
                        battery_pct: Some(88.0),
                        ..Default::default()
                    },
                    Utc::now(),
                )?;
                s.insert_telemetry(
                    &Telemetry {
                        node_hash: "79".to_string(),
                        ..Default::default()
                    },
                    Utc::now(),
                )?;
                Ok(())
            })
            .unwrap();

        let fa = store.session(|s| s.list_telemetry(Some("FA"), 100)).unwrap();
        assert_eq!(fa.len(), 1);
        assert_eq!(fa[0].battery_pct, Some(88.0));
        assert!(fa[0].recorded_at.is_some());

        let all = store.session(|s| s.list_telemetry(None, 100)).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_seeding_is_idempotent() {
        let store = store();
        assert_eq!(store.seed_builtin_rules().unwrap(), 3);
        assert_eq!(store.seed_builtin_rules().unwrap(), 0);

        let rules = store.session(|s| s.list_rules(false)).unwrap();
        assert_eq!(rules.len(), 3);
        assert!(rules.iter().all(|r| !r.enabled));

        let enabled = store.session(|s| s.list_rules(true)).unwrap();
        assert!(enabled.is_empty());
    }

    #[test]
    fn test_record_trigger_updates_stats() {
        let store = store();
        let rule = store
            .session(|s| {
                s.create_rule(&NewBotRule::new(
                    "adverts",
                    &Trigger::PacketType("ADVERT".to_string()),
                    "log",
                ))
            })
            .unwrap();
        assert_eq!(rule.trigger_count, 0);
        assert!(rule.last_triggered.is_none());

        let now = Utc::now();
        store.record_trigger(rule.id, now).unwrap();
        let updated = store.record_trigger(rule.id, now).unwrap().unwrap();
        assert_eq!(updated.trigger_count, 2);
        assert_eq!(updated.last_triggered, Some(now));

        assert!(store.session(|s| s.delete_rule(rule.id)).unwrap());
        assert!(store.record_trigger(rule.id, now).unwrap().is_none());
        assert!(!store.session(|s| s.delete_rule(rule.id)).unwrap());
    }
}
