//! Outbound transport abstraction
//!
//! Actions that talk to the mesh go through [`OutboundTransport`] so the
//! downstream API shape can change without touching the dispatcher.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use meshmon_core::LOCAL_NODE;

/// Timeout for every outbound action request
pub const ACTION_TIMEOUT_SECS: u64 = 5;

/// Errors raised inside an action
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

/// Mesh-facing side effects available to actions
#[async_trait]
pub trait OutboundTransport: Send + Sync {
    /// Send a text message to a node prefix or `flood`
    async fn send_message(&self, destination: &str, message: &str) -> Result<(), ActionError>;

    /// Ask a node (or the local repeater when `None`) for telemetry
    async fn request_telemetry(&self, node_hash: Option<&str>) -> Result<(), ActionError>;

    /// Transport name for logs
    fn name(&self) -> &str;
}

pub type SharedTransport = Arc<dyn OutboundTransport>;

/// Build the shared action HTTP client
pub fn action_client() -> Result<Client, ActionError> {
    Client::builder()
        .timeout(Duration::from_secs(ACTION_TIMEOUT_SECS))
        .build()
        .map_err(|e| ActionError::ClientBuild(e.to_string()))
}

/// Transport backed by the repeater's command API
pub struct RepeaterTransport {
    client: Client,
    base_url: String,
}

impl RepeaterTransport {
    pub fn new(base_url: &str) -> Result<Self, ActionError> {
        Ok(Self {
            client: action_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn shared(base_url: &str) -> Result<SharedTransport, ActionError> {
        Ok(Arc::new(Self::new(base_url)?))
    }
}

#[async_trait]
impl OutboundTransport for RepeaterTransport {
    async fn send_message(&self, destination: &str, message: &str) -> Result<(), ActionError> {
        let url = format!("{}/api/send", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({"destination": destination, "message": message}))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ActionError::Status {
                url,
                status: status.as_u16(),
            });
        }

        info!("[BOT] Sent message to {}: {}", destination, message);
        Ok(())
    }

    // The repeater exposes no telemetry command yet
    async fn request_telemetry(&self, node_hash: Option<&str>) -> Result<(), ActionError> {
        info!(
            "[BOT] Telemetry request for {} (no repeater endpoint yet)",
            node_hash.unwrap_or(LOCAL_NODE)
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "repeater"
    }
}
