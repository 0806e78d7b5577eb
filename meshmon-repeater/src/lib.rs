//! MeshCore Monitor Repeater Layer
//!
//! HTTP plumbing for the bridge:
//! - Client construction with timeouts and optional bearer credentials
//! - Polling the repeater's packet and neighbor endpoints
//! - Forwarding batches to the monitor's ingest endpoints

pub mod client;
pub mod monitor;
pub mod poller;

pub use client::*;
pub use monitor::*;
pub use poller::*;
