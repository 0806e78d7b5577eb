//! Rule engine
//!
//! Evaluates one event against every enabled rule in store order. Matching
//! rules fire in sequence; each firing is followed by a separate stats
//! update that re-reads the rule, so concurrent edits through the rule API
//! are not overwritten by a stale copy.

use chrono::Utc;
use tracing::{debug, info, warn};

use meshmon_core::{Event, Trigger};
use meshmon_store::{Store, StoreError};

use crate::ActionDispatcher;

/// Decode hex payload bytes as text, skipping invalid UTF-8 sequences.
///
/// Whitespace between hex digits is ignored.
pub fn decode_payload_text(payload_hex: &str) -> Option<String> {
    let digits: String = payload_hex
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = hex::decode(digits).ok()?;
    let mut text = String::with_capacity(bytes.len());
    let mut rest = bytes.as_slice();
    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                text.push_str(valid);
                return Some(text);
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                // valid_up_to guarantees this prefix is UTF-8
                text.push_str(std::str::from_utf8(valid).unwrap_or_default());
                match e.error_len() {
                    Some(skip) => rest = &after[skip..],
                    None => return Some(text),
                }
            }
        }
    }
}

/// Test a trigger predicate against an event
pub fn trigger_matches(trigger: &Trigger, event: &Event) -> bool {
    match trigger {
        Trigger::PacketType(value) => event.field("packet_type") == Some(value.as_str()),
        Trigger::Keyword(value) => event
            .field("payload_hex")
            .filter(|p| !p.is_empty())
            .and_then(decode_payload_text)
            .is_some_and(|text| text.to_lowercase().contains(&value.to_lowercase())),
        Trigger::NodeSeen(value) => event.field("source_hash") == Some(value.as_str()),
        Trigger::Unknown { .. } => false,
    }
}

/// Matches events against stored rules and fires their actions
#[derive(Clone)]
pub struct RuleEngine {
    store: Store,
    dispatcher: ActionDispatcher,
}

impl RuleEngine {
    pub fn new(store: Store, dispatcher: ActionDispatcher) -> Self {
        Self { store, dispatcher }
    }

    /// Evaluate `event` against all enabled rules.
    ///
    /// Returns the number of rules that fired. Only a failure to load the
    /// rule set is an error; stats update failures are logged per rule.
    pub async fn evaluate(&self, event: &Event) -> Result<usize, StoreError> {
        let rules = self.store.session(|s| s.list_rules(true))?;
        debug!("Evaluating {} event against {} rules", event.kind, rules.len());

        let mut fired = 0;
        for rule in &rules {
            if !trigger_matches(&rule.trigger(), event) {
                continue;
            }

            info!("Rule '{}' matched event", rule.name);
            self.dispatcher.execute(rule, event).await;
            fired += 1;

            if let Err(e) = self.store.record_trigger(rule.id, Utc::now()) {
                warn!("Failed to update stats for rule '{}': {}", rule.name, e);
            }
        }
        Ok(fired)
    }
}
