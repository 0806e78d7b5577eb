//! HTTP client construction
//!
//! Both sides of the bridge use plain reqwest clients with a fixed request
//! timeout. Credentials are installed as default headers so every request
//! made through a client carries them.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Request timeout for bridge traffic
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Header carrying the monitor's ingest credential
pub const API_KEY_HEADER: &str = "x-api-key";

/// Errors from the bridge HTTP layer
#[derive(Debug, Error)]
pub enum RepeaterError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),
}

impl RepeaterError {
    /// True for connection-level failures (refused, DNS, timeout)
    pub fn is_transport(&self) -> bool {
        match self {
            RepeaterError::Request(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            _ => false,
        }
    }
}

/// How a client authenticates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    None,
    /// `Authorization: Bearer <key>`
    Bearer(String),
    /// `X-API-Key: <key>`
    ApiKey(String),
}

impl Credential {
    /// Bearer credential if a key is configured
    pub fn bearer(key: Option<&str>) -> Self {
        match key.filter(|k| !k.is_empty()) {
            Some(k) => Credential::Bearer(k.to_string()),
            None => Credential::None,
        }
    }

    fn headers(&self) -> Result<HeaderMap, RepeaterError> {
        let mut headers = HeaderMap::new();
        let (name, value) = match self {
            Credential::None => return Ok(headers),
            Credential::Bearer(key) => (AUTHORIZATION, format!("Bearer {key}")),
            Credential::ApiKey(key) => (HeaderName::from_static(API_KEY_HEADER), key.clone()),
        };
        let mut value = HeaderValue::from_str(&value)
            .map_err(|e| RepeaterError::InvalidCredential(e.to_string()))?;
        value.set_sensitive(true);
        headers.insert(name, value);
        Ok(headers)
    }
}

/// Create an HTTP client carrying `credential` on every request
pub fn create_client(credential: &Credential, timeout: Duration) -> Result<Client, RepeaterError> {
    Client::builder()
        .default_headers(credential.headers()?)
        .timeout(timeout)
        .user_agent(concat!("meshmon/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| RepeaterError::ClientBuild(e.to_string()))
}

/// Join a base URL and an absolute path without doubling the slash
pub fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join() {
        assert_eq!(endpoint("http://pi:8000/", "/api/packets"), "http://pi:8000/api/packets");
        assert_eq!(endpoint("http://pi:8000", "api/neighbors"), "http://pi:8000/api/neighbors");
    }

    #[test]
    fn test_bearer_credential() {
        assert_eq!(Credential::bearer(None), Credential::None);
        assert_eq!(Credential::bearer(Some("")), Credential::None);

        let headers = Credential::bearer(Some("s3cret")).headers().unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer s3cret");
    }

    #[test]
    fn test_api_key_header() {
        let headers = Credential::ApiKey("changeme".to_string()).headers().unwrap();
        assert_eq!(headers.get("X-API-Key").unwrap(), "changeme");
    }

    #[test]
    fn test_invalid_credential_rejected() {
        let err = Credential::ApiKey("bad\nkey".to_string()).headers().unwrap_err();
        assert!(matches!(err, RepeaterError::InvalidCredential(_)));
    }
}
