use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use meshmon_core::Telemetry;

use super::default_limit;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TelemetryQuery {
    node_hash: Option<String>,
    #[serde(default = "default_limit")]
    limit: u32,
}

pub async fn list_telemetry(
    State(state): State<AppState>,
    Query(query): Query<TelemetryQuery>,
) -> Result<Json<Vec<Telemetry>>, ApiError> {
    let node_hash = query.node_hash.as_deref().filter(|h| !h.is_empty());
    let rows = state
        .store
        .session(|s| s.list_telemetry(node_hash, query.limit))?;
    Ok(Json(rows))
}
