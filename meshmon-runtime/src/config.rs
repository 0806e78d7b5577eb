//! Forwarder configuration file
//!
//! ```toml
//! poll_interval_seconds = 5
//!
//! [repeater]
//! url = "http://localhost:8000"
//! api_key = "optional"
//!
//! [monitor]
//! url = "http://monitor.local:8001"
//! api_key = "changeme"
//! ```

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use meshmon_core::DEFAULT_POLL_INTERVAL_SECS;
use meshmon_repeater::{MonitorConfig, RepeaterConfig, DEFAULT_TIMEOUT_SECS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepeaterSection {
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MonitorSection {
    pub url: String,
    pub api_key: String,
}

/// Bridge settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IngestorConfig {
    pub repeater: RepeaterSection,
    pub monitor: MonitorSection,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
}

impl Default for IngestorConfig {
    fn default() -> Self {
        Self {
            repeater: RepeaterSection {
                url: RepeaterConfig::default().url,
                api_key: None,
            },
            monitor: MonitorSection {
                url: MonitorConfig::default().url,
                api_key: MonitorConfig::default().api_key,
            },
            poll_interval_seconds: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

impl IngestorConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn repeater_config(&self) -> RepeaterConfig {
        RepeaterConfig {
            url: self.repeater.url.clone(),
            api_key: self.repeater.api_key.clone(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            url: self.monitor.url.clone(),
            api_key: self.monitor.api_key.clone(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}
