//! MeshCore Monitor Bot
//!
//! Lightweight automation driven by ingested events:
//! - FIFO event queue between the ingest path and the rule worker
//! - Rule engine matching events against enabled rules
//! - Action dispatcher with per-invocation failure isolation
//! - Pluggable outbound transport for messages and telemetry requests

pub mod actions;
pub mod engine;
pub mod queue;
pub mod transport;

pub use actions::*;
pub use engine::*;
pub use queue::*;
pub use transport::*;
