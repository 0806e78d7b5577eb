//! API route definitions.

mod health;
mod ingest;
mod nodes;
mod packets;
mod rules;
mod telemetry;
mod ws;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::auth::require_api_key;
use crate::state::AppState;

/// Default page size for list endpoints
pub(crate) const DEFAULT_LIMIT: u32 = 100;

pub(crate) fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

/// Build the complete router.
///
/// ## Public
/// - `GET /health`
/// - `GET /ws` - live-update socket
/// - `GET /api/nodes`, `GET /api/nodes/{node_hash}`
/// - `GET /api/packets`
/// - `GET /api/telemetry`
/// - `GET|POST /api/bot/rules`, `GET|PUT|DELETE /api/bot/rules/{id}`
///
/// ## Ingest (`X-API-Key` required)
/// - `POST /ingest/packets`
/// - `POST /ingest/neighbors`
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health::health_check))
        .route("/ws", get(ws::ws_handler));

    let api = Router::new()
        .route("/nodes", get(nodes::list_nodes))
        .route("/nodes/{node_hash}", get(nodes::get_node))
        .route("/packets", get(packets::list_packets))
        .route("/telemetry", get(telemetry::list_telemetry))
        .route("/bot/rules", get(rules::list_rules).post(rules::create_rule))
        .route(
            "/bot/rules/{id}",
            get(rules::get_rule)
                .put(rules::update_rule)
                .delete(rules::delete_rule),
        );

    let ingest = Router::new()
        .route("/packets", post(ingest::ingest_packets))
        .route("/neighbors", post(ingest::ingest_neighbors))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .merge(public)
        .nest("/api", api)
        .nest("/ingest", ingest)
        .with_state(state)
}
