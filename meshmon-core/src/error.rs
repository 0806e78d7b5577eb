//! Decode and validation errors for core records

use thiserror::Error;

/// Errors raised while decoding records or rule parameters
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid action config: {0}")]
    ActionConfig(#[from] serde_json::Error),

    #[error("action config must be a JSON object, got {0}")]
    ActionConfigShape(String),

    #[error("invalid timestamp: {0}")]
    Timestamp(String),
}
