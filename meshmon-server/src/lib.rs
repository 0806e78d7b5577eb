//! MeshCore Monitor Server - ingest, live updates and rule management
//!
//! # Authentication
//!
//! Only the ingest endpoints are protected. The bridge sends the shared
//! secret in `X-API-Key`; read endpoints, rule management and the live
//! socket are open.
//!
//! # Architecture
//!
//! - **AppState**: store handle, broadcast hub, ingest processor, config
//! - **IngestProcessor**: one store session per batch, then fan-out
//! - **BroadcastHub**: live-update subscribers
//! - **Routes**: endpoint handlers grouped by resource

mod auth;
pub mod config;
mod error;
pub mod hub;
pub mod ingest;
mod routes;
mod server;
mod state;

pub use self::auth::{require_api_key, API_KEY_HEADER};
pub use self::config::ServerConfig;
pub use self::error::ApiError;
pub use self::hub::{BroadcastHub, SubscriberId};
pub use self::ingest::IngestProcessor;
pub use self::routes::router;
pub use self::server::{build_app, serve};
pub use self::state::AppState;
