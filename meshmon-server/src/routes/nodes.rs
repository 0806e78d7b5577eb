use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use meshmon_core::Node;

use super::default_limit;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NodeQuery {
    #[serde(default = "default_limit")]
    limit: u32,
}

/// Nodes, most recently seen first.
pub async fn list_nodes(
    State(state): State<AppState>,
    Query(query): Query<NodeQuery>,
) -> Result<Json<Vec<Node>>, ApiError> {
    let nodes = state.store.session(|s| s.list_nodes(query.limit))?;
    Ok(Json(nodes))
}

pub async fn get_node(
    State(state): State<AppState>,
    Path(node_hash): Path<String>,
) -> Result<Json<Node>, ApiError> {
    state
        .store
        .session(|s| s.find_node(&node_hash))?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("node {node_hash}")))
}
