//! Ingest endpoints, called by the bridge.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

use meshmon_core::{NeighborIngest, PacketIngest};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct IngestResult {
    saved: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Ack {
    ok: bool,
}

fn decode<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::Unprocessable(rejection.body_text()))
}

pub async fn ingest_packets(
    State(state): State<AppState>,
    body: Result<Json<Vec<PacketIngest>>, JsonRejection>,
) -> Result<Json<IngestResult>, ApiError> {
    let packets = decode(body)?;
    let saved = state.ingest.ingest_packets(&packets)?;
    Ok(Json(IngestResult { saved }))
}

pub async fn ingest_neighbors(
    State(state): State<AppState>,
    body: Result<Json<Vec<NeighborIngest>>, JsonRejection>,
) -> Result<Json<Ack>, ApiError> {
    let neighbors = decode(body)?;
    state.ingest.ingest_neighbors(&neighbors)?;
    Ok(Json(Ack { ok: true }))
}
