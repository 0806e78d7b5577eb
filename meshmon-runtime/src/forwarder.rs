//! Bridge forwarder loop
//!
//! Each cycle polls the repeater, drops packets this process has already
//! delivered, and posts the rest to the monitor. Neighbor tables are
//! forwarded as received. The packet and neighbor legs fail independently;
//! a failed leg is logged and retried on the next cycle at the same interval.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use meshmon_core::{Deduplicator, PacketIngest};
use meshmon_repeater::{IngestEndpoint, MonitorClient, RepeaterClient, RepeaterError};

use crate::shutdown_requested;

/// Where raw records come from
#[async_trait]
pub trait PacketSource: Send + Sync {
    async fn fetch_packets(&self) -> Result<Vec<Value>, RepeaterError>;
    async fn fetch_neighbors(&self) -> Result<Vec<Value>, RepeaterError>;
    fn describe(&self) -> String;
}

/// Where forwarded batches go
#[async_trait]
pub trait IngestSink: Send + Sync {
    async fn post_packets(&self, packets: &[PacketIngest]) -> Result<usize, RepeaterError>;
    async fn post_neighbors(&self, neighbors: &[Value]) -> Result<usize, RepeaterError>;
    fn describe(&self) -> String;
}

#[async_trait]
impl PacketSource for RepeaterClient {
    async fn fetch_packets(&self) -> Result<Vec<Value>, RepeaterError> {
        RepeaterClient::fetch_packets(self).await
    }

    async fn fetch_neighbors(&self) -> Result<Vec<Value>, RepeaterError> {
        RepeaterClient::fetch_neighbors(self).await
    }

    fn describe(&self) -> String {
        self.base_url().to_string()
    }
}

#[async_trait]
impl IngestSink for MonitorClient {
    async fn post_packets(&self, packets: &[PacketIngest]) -> Result<usize, RepeaterError> {
        self.post_batch(IngestEndpoint::Packets, packets).await
    }

    async fn post_neighbors(&self, neighbors: &[Value]) -> Result<usize, RepeaterError> {
        self.post_batch(IngestEndpoint::Neighbors, neighbors).await
    }

    fn describe(&self) -> String {
        self.base_url().to_string()
    }
}

/// Counts from one poll cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub packets_polled: usize,
    pub packets_forwarded: usize,
    pub neighbors_forwarded: usize,
    /// Legs that failed this cycle
    pub failures: usize,
}

fn log_leg_error(leg: &str, e: &RepeaterError) {
    if e.is_transport() {
        warn!("Request error forwarding {}: {}", leg, e);
    } else {
        error!("Unexpected error forwarding {}: {}", leg, e);
    }
}

/// Poll-dedup-forward loop state
pub struct Forwarder<S, K> {
    source: S,
    sink: K,
    dedup: Deduplicator,
    interval: Duration,
}

impl<S: PacketSource, K: IngestSink> Forwarder<S, K> {
    pub fn new(source: S, sink: K, interval: Duration) -> Self {
        Self {
            source,
            sink,
            dedup: Deduplicator::new(),
            interval,
        }
    }

    /// Fingerprints remembered so far
    pub fn seen_count(&self) -> usize {
        self.dedup.seen_count()
    }

    /// Returns `(polled, forwarded)`. Fingerprints are committed only after
    /// the monitor accepted the batch.
    async fn forward_packets(&mut self) -> Result<(usize, usize), RepeaterError> {
        let raw = self.source.fetch_packets().await?;
        let batch = self.dedup.pending(&raw, Utc::now());
        let forwarded = self.sink.post_packets(&batch.packets).await?;
        self.dedup.commit(batch.fingerprints);
        Ok((raw.len(), forwarded))
    }

    async fn forward_neighbors(&self) -> Result<usize, RepeaterError> {
        let neighbors = self.source.fetch_neighbors().await?;
        self.sink.post_neighbors(&neighbors).await
    }

    /// Run one poll cycle, logging any failed leg
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        match self.forward_packets().await {
            Ok((polled, forwarded)) => {
                report.packets_polled = polled;
                report.packets_forwarded = forwarded;
            }
            Err(e) => {
                log_leg_error("packets", &e);
                report.failures += 1;
            }
        }

        match self.forward_neighbors().await {
            Ok(forwarded) => report.neighbors_forwarded = forwarded,
            Err(e) => {
                log_leg_error("neighbors", &e);
                report.failures += 1;
            }
        }

        report
    }

    /// Loop until `shutdown` fires
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Ingestor starting  repeater={}  monitor={}  interval={}s",
            self.source.describe(),
            self.sink.describe(),
            self.interval.as_secs()
        );

        loop {
            let report = self.run_cycle().await;
            debug!("Poll cycle: {:?}", report);

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                stop = shutdown_requested(&mut shutdown) => {
                    if stop {
                        info!("Ingestor stopping");
                        return;
                    }
                }
            }
        }
    }
}
