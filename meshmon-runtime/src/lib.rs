//! MeshCore Monitor Runtime
//!
//! The long-lived loops of both processes:
//! - [`Forwarder`]: repeater poll, dedup and forward to the monitor
//! - [`RuleWorker`]: drains the event queue into the rule engine
//!
//! Each loop owns its state and takes its interval and a shutdown signal
//! as parameters.

pub mod config;
pub mod forwarder;
pub mod shutdown;
pub mod worker;

pub use config::*;
pub use forwarder::*;
pub use shutdown::*;
pub use worker::*;
