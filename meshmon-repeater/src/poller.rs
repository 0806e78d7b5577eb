//! Repeater API poller
//!
//! Reads the repeater's recent packet buffer and neighbor table. Records are
//! returned raw; normalization and dedup happen in the forwarder.

use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::{create_client, endpoint, Credential, RepeaterError, DEFAULT_TIMEOUT_SECS};

/// Repeater connection settings
#[derive(Debug, Clone)]
pub struct RepeaterConfig {
    /// Base URL of the repeater HTTP API
    pub url: String,
    /// Optional bearer key
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for RepeaterConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Client for the repeater's read API
#[derive(Debug, Clone)]
pub struct RepeaterClient {
    client: Client,
    base_url: String,
}

impl RepeaterClient {
    pub fn new(config: &RepeaterConfig) -> Result<Self, RepeaterError> {
        let credential = Credential::bearer(config.api_key.as_deref());
        Ok(Self {
            client: create_client(&credential, Duration::from_secs(config.timeout_secs))?,
            base_url: config.url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /api/packets`
    pub async fn fetch_packets(&self) -> Result<Vec<Value>, RepeaterError> {
        self.get_array("/api/packets").await
    }

    /// `GET /api/neighbors`
    pub async fn fetch_neighbors(&self) -> Result<Vec<Value>, RepeaterError> {
        self.get_array("/api/neighbors").await
    }

    /// Check that the repeater answers its packet endpoint
    pub async fn check_connection(&self) -> bool {
        match self.fetch_packets().await {
            Ok(packets) => {
                debug!("Repeater reachable, {} buffered packets", packets.len());
                true
            }
            Err(e) => {
                debug!("Repeater check failed: {}", e);
                false
            }
        }
    }

    async fn get_array(&self, path: &str) -> Result<Vec<Value>, RepeaterError> {
        let url = endpoint(&self.base_url, path);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RepeaterError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let records: Vec<Value> = response.json().await?;
        debug!("GET {} returned {} records", url, records.len());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RepeaterConfig::default();
        assert!(config.url.contains("8000"));
        assert_eq!(config.timeout_secs, 10);
        assert!(config.api_key.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_repeater() {
        let client = RepeaterClient::new(&RepeaterConfig {
            url: "http://127.0.0.1:9".to_string(),
            api_key: Some("key".to_string()),
            timeout_secs: 2,
        })
        .unwrap();

        let err = client.fetch_packets().await.unwrap_err();
        assert!(err.is_transport());
        assert!(!client.check_connection().await);
    }
}
