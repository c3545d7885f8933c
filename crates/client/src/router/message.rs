//! Control messages sent from the page context.

use serde::{Deserialize, Serialize};

use folio_core::Error;

use super::{ActivateReport, BatchReport, CacheRouter};

/// A message the router understands, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    SkipWaiting,
    CacheUrls { urls: Vec<String> },
}

impl ControlMessage {
    /// Parse a raw message. Unknown or malformed messages yield `None`.
    pub fn parse(value: &serde_json::Value) -> Option<Self> {
        match serde_json::from_value(value.clone()) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring message");
                None
            }
        }
    }
}

/// What handling a message did.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "handled", rename_all = "kebab-case")]
pub enum MessageOutcome {
    /// The skip-waiting flag was set; `activation` is present when a waiting
    /// worker was promoted.
    SkipWaiting { activation: Option<ActivateReport> },
    CacheUrls { report: BatchReport },
    Ignored,
}

impl CacheRouter {
    pub async fn handle_message(&self, message: &serde_json::Value) -> Result<MessageOutcome, Error> {
        let Some(message) = ControlMessage::parse(message) else {
            return Ok(MessageOutcome::Ignored);
        };

        match message {
            ControlMessage::SkipWaiting => {
                let activation = self.skip_waiting().await?;
                Ok(MessageOutcome::SkipWaiting { activation })
            }
            ControlMessage::CacheUrls { urls } => {
                let report = self.cache_urls(&urls).await;
                Ok(MessageOutcome::CacheUrls { report })
            }
        }
    }
}
