//! In-memory fingerprint set for the bridge
//!
//! The set only grows. There is no eviction and nothing is persisted, so a
//! restart forgets every fingerprint; the server's dedup on `packet_hash` is
//! the durable backstop.
//!
//! Filtering does not record anything. Fingerprints are committed only once
//! the batch carrying them was delivered, so a failed delivery is retried on
//! the next poll.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;

use crate::{fingerprint, normalize_packet, PacketIngest};

/// Packets not yet delivered, plus the fingerprints to commit after delivery
#[derive(Debug, Clone, Default)]
pub struct PendingBatch {
    pub packets: Vec<PacketIngest>,
    pub fingerprints: Vec<String>,
}

impl PendingBatch {
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }
}

/// Filters raw records already delivered by this process
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize every record whose fingerprint is neither committed nor
    /// repeated earlier in `raw`, preserving input order. Records without a
    /// fingerprint are always included.
    pub fn pending(&self, raw: &[Value], now: DateTime<Utc>) -> PendingBatch {
        let mut batch = PendingBatch::default();
        let mut in_batch = HashSet::new();

        for record in raw {
            if let Some(hash) = fingerprint(record) {
                if self.seen.contains(&hash) || !in_batch.insert(hash.clone()) {
                    continue;
                }
                batch.fingerprints.push(hash);
            }
            batch.packets.push(normalize_packet(record, now));
        }
        batch
    }

    /// Remember fingerprints of a delivered batch
    pub fn commit<I>(&mut self, fingerprints: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.seen.extend(fingerprints);
    }

    /// Number of fingerprints remembered
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.seen.contains(hash)
    }
}
