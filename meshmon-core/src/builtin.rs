//! Built-in bot rule registry
//!
//! Seeded disabled at server start so users can switch them on from the
//! rule management API.

use serde_json::json;

use crate::{NewBotRule, Trigger, FLOOD_DESTINATION};

/// A built-in rule template
#[derive(Debug, Clone)]
pub struct BuiltinRule {
    /// Unique name; seeding skips any existing rule with this name
    pub name: &'static str,
    pub trigger_type: &'static str,
    pub trigger_value: &'static str,
    pub action_type: &'static str,
}

impl BuiltinRule {
    /// Materialize the template as a disabled rule
    pub fn to_new_rule(&self) -> NewBotRule {
        let trigger = Trigger::parse(self.trigger_type, self.trigger_value);
        let config = match self.action_type {
            "send_message" => json!({"destination": FLOOD_DESTINATION, "message": "pong"}),
            "webhook" => json!({"url": "https://hooks.example.com/meshcore"}),
            _ => json!({}),
        };
        NewBotRule::new(self.name, &trigger, self.action_type)
            .with_config(config)
            .disabled()
    }
}

/// Default rule set
pub static BUILTIN_RULES: &[BuiltinRule] = &[
    BuiltinRule {
        name: "Log all ADVERT packets",
        trigger_type: "packet_type",
        trigger_value: "ADVERT",
        action_type: "log",
    },
    BuiltinRule {
        name: "Ping reply",
        trigger_type: "keyword",
        trigger_value: "ping",
        action_type: "send_message",
    },
    // Fill in a node hash to watch
    BuiltinRule {
        name: "New node alert webhook",
        trigger_type: "node_seen",
        trigger_value: "",
        action_type: "webhook",
    },
];
