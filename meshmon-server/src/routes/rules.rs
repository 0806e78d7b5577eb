//! Bot rule management endpoints.
//!
//! Updates replace the user-editable fields only; `trigger_count` and
//! `last_triggered` are owned by the rule engine.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use meshmon_core::{BotRule, NewBotRule};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct Deleted {
    ok: bool,
}

fn rule_not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("rule {id}"))
}

fn decode(body: Result<Json<NewBotRule>, JsonRejection>) -> Result<NewBotRule, ApiError> {
    body.map(|Json(rule)| rule)
        .map_err(|rejection| ApiError::Unprocessable(rejection.body_text()))
}

pub async fn list_rules(State(state): State<AppState>) -> Result<Json<Vec<BotRule>>, ApiError> {
    Ok(Json(state.store.session(|s| s.list_rules(false))?))
}

pub async fn get_rule(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BotRule>, ApiError> {
    state
        .store
        .session(|s| s.get_rule(id))?
        .map(Json)
        .ok_or_else(|| rule_not_found(id))
}

pub async fn create_rule(
    State(state): State<AppState>,
    body: Result<Json<NewBotRule>, JsonRejection>,
) -> Result<Json<BotRule>, ApiError> {
    let body = decode(body)?;
    let rule = state.store.session(|s| s.create_rule(&body))?;
    tracing::info!(id = rule.id, name = %rule.name, "created bot rule");
    Ok(Json(rule))
}

pub async fn update_rule(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<NewBotRule>, JsonRejection>,
) -> Result<Json<BotRule>, ApiError> {
    let body = decode(body)?;
    let updated = state.store.session(|s| {
        let Some(mut rule) = s.get_rule(id)? else {
            return Ok(None);
        };
        rule.apply(body);
        s.save_rule(&rule)?;
        Ok(Some(rule))
    })?;
    updated.map(Json).ok_or_else(|| rule_not_found(id))
}

pub async fn delete_rule(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Deleted>, ApiError> {
    if state.store.session(|s| s.delete_rule(id))? {
        Ok(Json(Deleted { ok: true }))
    } else {
        Err(rule_not_found(id))
    }
}
