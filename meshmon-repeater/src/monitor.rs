//! Monitor ingest client
//!
//! Forwards batches to `POST {monitor}/ingest/{endpoint}` with the shared
//! ingest key.

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

use crate::{create_client, endpoint, Credential, RepeaterError, DEFAULT_TIMEOUT_SECS};

/// Monitor connection settings
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Base URL of the monitor server
    pub url: String,
    /// Value sent as `X-API-Key`
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8001".to_string(),
            api_key: "changeme".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Ingest endpoint selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestEndpoint {
    Packets,
    Neighbors,
}

impl IngestEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            IngestEndpoint::Packets => "/ingest/packets",
            IngestEndpoint::Neighbors => "/ingest/neighbors",
        }
    }
}

/// Client for the monitor's ingest API
#[derive(Debug, Clone)]
pub struct MonitorClient {
    client: Client,
    base_url: String,
}

impl MonitorClient {
    pub fn new(config: &MonitorConfig) -> Result<Self, RepeaterError> {
        let credential = Credential::ApiKey(config.api_key.clone());
        Ok(Self {
            client: create_client(&credential, Duration::from_secs(config.timeout_secs))?,
            base_url: config.url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a batch as a JSON array. Empty batches are not sent.
    ///
    /// Returns the number of records sent.
    pub async fn post_batch<T: Serialize>(
        &self,
        target: IngestEndpoint,
        records: &[T],
    ) -> Result<usize, RepeaterError> {
        if records.is_empty() {
            return Ok(0);
        }

        let url = endpoint(&self.base_url, target.path());
        let response = self.client.post(&url).json(records).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RepeaterError::Status {
                url,
                status: status.as_u16(),
            });
        }

        info!(
            "POST {} -> {} ({} items)",
            target.path(),
            status.as_u16(),
            records.len()
        );
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshmon_core::PacketIngest;

    fn unreachable() -> MonitorClient {
        MonitorClient::new(&MonitorConfig {
            url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_empty_batch_not_sent() {
        let sent = unreachable()
            .post_batch::<PacketIngest>(IngestEndpoint::Packets, &[])
            .await
            .unwrap();
        assert_eq!(sent, 0);
    }

    #[tokio::test]
    async fn test_unreachable_monitor() {
        let err = unreachable()
            .post_batch(IngestEndpoint::Packets, &[PacketIngest::default()])
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn test_endpoint_paths() {
        assert_eq!(IngestEndpoint::Packets.path(), "/ingest/packets");
        assert_eq!(IngestEndpoint::Neighbors.path(), "/ingest/neighbors");
    }
}
