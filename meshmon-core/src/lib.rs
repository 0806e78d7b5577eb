//! MeshCore Monitor Core - record types and domain model
//!
//! This crate provides the foundational primitives shared by the bridge and
//! the monitoring server:
//! - Packet, node, neighbor and telemetry records
//! - Upstream normalization and the in-memory fingerprint set
//! - Live/bot event envelopes
//! - Bot rule model with closed trigger and action kinds
//! - Built-in rule registry

pub mod builtin;
pub mod dedup;
pub mod error;
pub mod event;
pub mod normalize;
pub mod records;
pub mod rules;

pub use builtin::*;
pub use dedup::*;
pub use error::*;
pub use event::*;
pub use normalize::*;
pub use records::*;
pub use rules::*;

/// Default seconds between forwarder poll cycles
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Packet/route classification used when upstream gives none
pub const UNKNOWN_KIND: &str = "UNKNOWN";

/// Observer id recorded for neighbor rows that do not name one
pub const LOCAL_NODE: &str = "local";

/// Default destination for outbound bot messages
pub const FLOOD_DESTINATION: &str = "flood";
