use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use meshmon_core::Packet;
use meshmon_store::PacketFilter;

use super::default_limit;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PacketQuery {
    #[serde(default = "default_limit")]
    limit: u32,
    packet_type: Option<String>,
    source_hash: Option<String>,
}

/// Packets newest first, optionally filtered by type and source.
pub async fn list_packets(
    State(state): State<AppState>,
    Query(query): Query<PacketQuery>,
) -> Result<Json<Vec<Packet>>, ApiError> {
    let filter = PacketFilter {
        limit: query.limit,
        packet_type: query.packet_type.filter(|t| !t.is_empty()),
        source_hash: query.source_hash.filter(|h| !h.is_empty()),
        packet_hash: None,
    };
    let packets = state.store.session(|s| s.list_packets(&filter))?;
    Ok(Json(packets))
}
