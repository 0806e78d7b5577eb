//! Application state shared by all handlers.

use std::sync::Arc;

use meshmon_bot::EventSender;
use meshmon_store::Store;

use crate::config::ServerConfig;
use crate::hub::BroadcastHub;
use crate::ingest::IngestProcessor;

/// Cheap to clone; every field is a handle.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub store: Store,
    pub hub: BroadcastHub,
    pub ingest: IngestProcessor,
}

impl AppState {
    /// `events` is `None` when the rule worker is disabled.
    pub fn new(config: ServerConfig, store: Store, events: Option<EventSender>) -> Self {
        let hub = BroadcastHub::new();
        let ingest = IngestProcessor::new(store.clone(), hub.clone(), events);
        Self {
            config: Arc::new(config),
            store,
            hub,
            ingest,
        }
    }
}
