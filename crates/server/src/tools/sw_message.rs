//! sw_message tool implementation.
//!
//! Delivers a control message from the page context (`SKIP_WAITING` or
//! `CACHE_URLS`). Unknown types are acknowledged and ignored.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use folio_client::CacheRouter;

use super::json_result;

/// Input parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message type: "SKIP_WAITING" or "CACHE_URLS".
    #[serde(rename = "type")]
    pub kind: String,

    /// URLs to cache, for "CACHE_URLS".
    #[serde(default)]
    pub urls: Option<Vec<String>>,
}

impl SwMessageParams {
    fn to_message(&self) -> serde_json::Value {
        let mut message = serde_json::json!({ "type": self.kind });
        if let Some(urls) = &self.urls {
            message["urls"] = serde_json::json!(urls);
        }
        message
    }
}

pub async fn message_impl(router: &CacheRouter, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let outcome = router.handle_message(&params.to_message()).await?;
    json_result(&outcome)
}
