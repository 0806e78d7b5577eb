//! Ingest credential middleware.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the shared ingest secret
pub const API_KEY_HEADER: &str = "x-api-key";

/// Require `X-API-Key` to match the configured ingest key.
///
/// A missing or wrong key is 403 and the request body is never read.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(key) if key == state.config.ingest_api_key => Ok(next.run(request).await),
        Some(_) => {
            tracing::debug!("invalid ingest api key");
            Err(ApiError::Forbidden)
        }
        None => {
            tracing::debug!("missing x-api-key header");
            Err(ApiError::Forbidden)
        }
    }
}
