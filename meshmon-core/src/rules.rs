//! Bot automation rules
//!
//! Rules are stored with string-valued `trigger_type` / `action_type` so the
//! management API can round-trip anything a user typed. Evaluation goes
//! through the closed [`Trigger`] and [`Action`] enums; unknown kinds parse
//! to explicit `Unknown` variants that never fire or do nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{CoreError, FLOOD_DESTINATION};

fn default_enabled() -> bool {
    true
}

fn empty_config() -> String {
    "{}".to_string()
}

/// A persisted bot rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotRule {
    pub id: i64,
    pub name: String,
    pub enabled: bool,
    /// One of `packet_type`, `keyword`, `node_seen`
    pub trigger_type: String,
    /// Value to match against (e.g. `ADVERT`, `ping`)
    pub trigger_value: String,
    /// One of `log`, `send_message`, `webhook`, `telemetry_request`
    pub action_type: String,
    /// JSON object of action parameters
    pub action_config: String,
    pub last_triggered: Option<DateTime<Utc>>,
    pub trigger_count: i64,
}

/// Body for creating or replacing a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBotRule {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub trigger_type: String,
    pub trigger_value: String,
    pub action_type: String,
    #[serde(default = "empty_config")]
    pub action_config: String,
}

impl NewBotRule {
    pub fn new(name: &str, trigger: &Trigger, action_type: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
            trigger_type: trigger.kind().to_string(),
            trigger_value: trigger.value().to_string(),
            action_type: action_type.to_string(),
            action_config: empty_config(),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.action_config = config.to_string();
        self
    }
}

/// Match predicate selected by a rule's trigger kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Exact match on the event's `packet_type`
    PacketType(String),
    /// Case-insensitive substring of the decoded `payload_hex`
    Keyword(String),
    /// Exact match on the event's `source_hash`
    NodeSeen(String),
    /// Unrecognized kind; never matches
    Unknown { kind: String, value: String },
}

impl Trigger {
    pub fn parse(kind: &str, value: &str) -> Self {
        let value = value.to_string();
        match kind {
            "packet_type" => Trigger::PacketType(value),
            "keyword" => Trigger::Keyword(value),
            "node_seen" => Trigger::NodeSeen(value),
            other => Trigger::Unknown {
                kind: other.to_string(),
                value,
            },
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            Trigger::PacketType(_) => "packet_type",
            Trigger::Keyword(_) => "keyword",
            Trigger::NodeSeen(_) => "node_seen",
            Trigger::Unknown { kind, .. } => kind,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Trigger::PacketType(v) | Trigger::Keyword(v) | Trigger::NodeSeen(v) => v,
            Trigger::Unknown { value, .. } => value,
        }
    }
}

/// Side effect selected by a rule's action kind, with its parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Log,
    SendMessage {
        destination: String,
        message: Option<String>,
    },
    Webhook {
        url: Option<String>,
    },
    TelemetryRequest {
        node_hash: Option<String>,
    },
    Unknown(String),
}

impl Action {
    /// Build an action from its kind and an already-decoded config object
    pub fn parse(kind: &str, config: &Map<String, Value>) -> Self {
        let text = |key: &str| config.get(key).and_then(Value::as_str).map(str::to_string);
        match kind {
            "log" => Action::Log,
            "send_message" => Action::SendMessage {
                destination: text("destination").unwrap_or_else(|| FLOOD_DESTINATION.to_string()),
                message: text("message"),
            },
            "webhook" => Action::Webhook { url: text("url") },
            "telemetry_request" => Action::TelemetryRequest {
                node_hash: text("node_hash"),
            },
            other => Action::Unknown(other.to_string()),
        }
    }
}

impl BotRule {
    pub fn trigger(&self) -> Trigger {
        Trigger::parse(&self.trigger_type, &self.trigger_value)
    }

    /// Decode `action_config` as a JSON object
    pub fn action_config(&self) -> Result<Map<String, Value>, CoreError> {
        match serde_json::from_str::<Value>(&self.action_config)? {
            Value::Object(map) => Ok(map),
            other => Err(CoreError::ActionConfigShape(other.to_string())),
        }
    }

    /// Resolve the action, treating an undecodable config as empty
    pub fn action(&self) -> Result<Action, (Action, CoreError)> {
        match self.action_config() {
            Ok(config) => Ok(Action::parse(&self.action_type, &config)),
            Err(e) => Err((Action::parse(&self.action_type, &Map::new()), e)),
        }
    }

    /// Apply a create/update body, leaving statistics untouched
    pub fn apply(&mut self, body: NewBotRule) {
        self.name = body.name;
        self.enabled = body.enabled;
        self.trigger_type = body.trigger_type;
        self.trigger_value = body.trigger_value;
        self.action_type = body.action_type;
        self.action_config = body.action_config;
    }

    /// Record one firing
    pub fn record_trigger(&mut self, now: DateTime<Utc>) {
        self.last_triggered = Some(match self.last_triggered {
            Some(prev) if prev > now => prev,
            _ => now,
        });
        self.trigger_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(action_type: &str, config: &str) -> BotRule {
        BotRule {
            id: 1,
            name: "test".to_string(),
            enabled: true,
            trigger_type: "packet_type".to_string(),
            trigger_value: "ADVERT".to_string(),
            action_type: action_type.to_string(),
            action_config: config.to_string(),
            last_triggered: None,
            trigger_count: 0,
        }
    }

    #[test]
    fn test_trigger_parse_round_trip() {
        for (kind, expected) in [
            ("packet_type", Trigger::PacketType("x".to_string())),
            ("keyword", Trigger::Keyword("x".to_string())),
            ("node_seen", Trigger::NodeSeen("x".to_string())),
        ] {
            let trigger = Trigger::parse(kind, "x");
            assert_eq!(trigger, expected);
            assert_eq!(trigger.kind(), kind);
        }

        let unknown = Trigger::parse("schedule", "*/5");
        assert!(matches!(unknown, Trigger::Unknown { .. }));
        assert_eq!(unknown.kind(), "schedule");
        assert_eq!(unknown.value(), "*/5");
    }

    #[test]
    fn test_send_message_defaults_to_flood() {
        let action = rule("send_message", r#"{"message":"pong"}"#).action().unwrap();
        assert_eq!(
            action,
            Action::SendMessage {
                destination: "flood".to_string(),
                message: Some("pong".to_string()),
            }
        );
    }

    #[test]
    fn test_bad_config_falls_back_to_empty() {
        let (action, err) = rule("webhook", "not json").action().unwrap_err();
        assert_eq!(action, Action::Webhook { url: None });
        assert!(matches!(err, CoreError::ActionConfig(_)));

        let (_, err) = rule("log", "[1,2]").action().unwrap_err();
        assert!(matches!(err, CoreError::ActionConfigShape(_)));
    }

    #[test]
    fn test_unknown_action() {
        let action = rule("launch_rocket", "{}").action().unwrap();
        assert_eq!(action, Action::Unknown("launch_rocket".to_string()));
    }

    #[test]
    fn test_record_trigger_is_monotonic() {
        let mut r = rule("log", "{}");
        let now = Utc::now();
        r.record_trigger(now);
        r.record_trigger(now - chrono::Duration::seconds(30));

        assert_eq!(r.trigger_count, 2);
        assert_eq!(r.last_triggered, Some(now));
    }

    #[test]
    fn test_new_rule_body_defaults() {
        let body: NewBotRule = serde_json::from_value(json!({
            "name": "Test Rule",
            "trigger_type": "packet_type",
            "trigger_value": "ADVERT",
            "action_type": "log"
        }))
        .unwrap();
        assert!(body.enabled);
        assert_eq!(body.action_config, "{}");
    }
}
