//! Server configuration loaded from the environment.

use std::path::PathBuf;
use tracing::{info, warn};

/// Ingest key used when none is configured
pub const DEFAULT_INGEST_API_KEY: &str = "changeme";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind address (e.g. "0.0.0.0:8001")
    pub bind_addr: String,
    /// SQLite file, or `:memory:`
    pub database_path: PathBuf,
    /// Shared secret expected in `X-API-Key` on ingest requests
    pub ingest_api_key: String,
    /// Base URL of the repeater command API used by bot actions
    pub repeater_url: String,
    pub bot_enabled: bool,
    /// CORS origins; `None` allows any
    pub allowed_origins: Option<Vec<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8001".to_string(),
            database_path: PathBuf::from("meshcore_monitor.db"),
            ingest_api_key: DEFAULT_INGEST_API_KEY.to_string(),
            repeater_url: "http://localhost:8000".to_string(),
            bot_enabled: true,
            allowed_origins: None,
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

fn parse_origins(raw: &str) -> Option<Vec<String>> {
    let origins: Vec<String> = raw.split_whitespace().map(str::to_string).collect();
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        None
    } else {
        Some(origins)
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// - `MESHMON_BIND_ADDR` (default "0.0.0.0:8001")
    /// - `DATABASE_PATH` (default "meshcore_monitor.db")
    /// - `INGEST_API_KEY` (default "changeme")
    /// - `REPEATER_URL` (default "http://localhost:8000")
    /// - `BOT_ENABLED` (1/true/yes, default true)
    /// - `ALLOWED_ORIGINS` (whitespace separated, default any)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let config = Self {
            bind_addr: lookup("MESHMON_BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_path: lookup("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            ingest_api_key: lookup("INGEST_API_KEY").unwrap_or(defaults.ingest_api_key),
            repeater_url: lookup("REPEATER_URL").unwrap_or(defaults.repeater_url),
            bot_enabled: lookup("BOT_ENABLED")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.bot_enabled),
            allowed_origins: lookup("ALLOWED_ORIGINS").and_then(|v| parse_origins(&v)),
        };

        if config.ingest_api_key == DEFAULT_INGEST_API_KEY {
            warn!("INGEST_API_KEY is the default value; set a secret before exposing the server");
        }

        info!(
            bind_addr = %config.bind_addr,
            database = %config.database_path.display(),
            repeater_url = %config.repeater_url,
            bot_enabled = config.bot_enabled,
            "configuration loaded"
        );
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> ServerConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(load(&[]), ServerConfig::default());
    }

    #[test]
    fn test_bot_flag_values() {
        assert!(load(&[("BOT_ENABLED", "YES")]).bot_enabled);
        assert!(load(&[("BOT_ENABLED", "1")]).bot_enabled);
        assert!(!load(&[("BOT_ENABLED", "false")]).bot_enabled);
        assert!(!load(&[("BOT_ENABLED", "off")]).bot_enabled);
    }

    #[test]
    fn test_origins() {
        assert_eq!(load(&[("ALLOWED_ORIGINS", "*")]).allowed_origins, None);
        assert_eq!(
            load(&[("ALLOWED_ORIGINS", "http://a.local  http://b.local")]).allowed_origins,
            Some(vec!["http://a.local".to_string(), "http://b.local".to_string()])
        );
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DATABASE_PATH", ":memory:"),
            ("INGEST_API_KEY", "s3cret"),
            ("MESHMON_BIND_ADDR", "127.0.0.1:9000"),
        ]);
        assert_eq!(config.database_path, PathBuf::from(":memory:"));
        assert_eq!(config.ingest_api_key, "s3cret");
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
    }
}
