//! Action dispatcher
//!
//! `execute` never fails: every error inside an action is logged and
//! swallowed so one bad rule cannot stop the others.

use reqwest::Client;
use tracing::{info, warn};

use meshmon_core::{Action, BotRule, Event, LOCAL_NODE};

use crate::{action_client, ActionError, SharedTransport};

/// Runs the side effect selected by a rule
#[derive(Clone)]
pub struct ActionDispatcher {
    transport: SharedTransport,
    http: Client,
}

impl ActionDispatcher {
    pub fn new(transport: SharedTransport) -> Result<Self, ActionError> {
        Ok(Self {
            transport,
            http: action_client()?,
        })
    }

    /// Run `rule`'s action for `event`
    pub async fn execute(&self, rule: &BotRule, event: &Event) {
        let action = match rule.action() {
            Ok(action) => action,
            Err((fallback, e)) => {
                warn!("[BOT] Rule '{}' has invalid action_config ({}), using {{}}", rule.name, e);
                fallback
            }
        };

        match action {
            Action::Log => {
                info!("[BOT] Rule '{}' triggered: {}", rule.name, event.to_json());
            }
            Action::SendMessage {
                destination,
                message: Some(message),
            } => {
                if let Err(e) = self.transport.send_message(&destination, &message).await {
                    warn!("[BOT] Failed to send message via {}: {}", self.transport.name(), e);
                }
            }
            Action::SendMessage { message: None, .. } => {
                warn!("[BOT] Rule '{}' send_message has no message configured", rule.name);
            }
            Action::Webhook { url: Some(url) } => {
                if let Err(e) = self.call_webhook(&url, event).await {
                    warn!("[BOT] Webhook failed for {}: {}", url, e);
                }
            }
            Action::Webhook { url: None } => {
                warn!("[BOT] Rule '{}' webhook has no url configured", rule.name);
            }
            Action::TelemetryRequest { node_hash } => {
                let target = node_hash.as_deref();
                if let Err(e) = self.transport.request_telemetry(target).await {
                    warn!(
                        "[BOT] Telemetry request for {} failed: {}",
                        target.unwrap_or(LOCAL_NODE),
                        e
                    );
                }
            }
            Action::Unknown(kind) => {
                warn!("[BOT] Unknown action type '{}'", kind);
            }
        }
    }

    async fn call_webhook(&self, url: &str, event: &Event) -> Result<(), ActionError> {
        self.http.post(url).json(event).send().await?;
        info!("[BOT] Webhook delivered to {}", url);
        Ok(())
    }
}
