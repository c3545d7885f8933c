//! sw_sync tool implementation.
//!
//! Delivers a background-sync event. Only the configured tag refreshes the
//! API endpoints; other tags are acknowledged and ignored.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use folio_client::{BatchReport, CacheRouter};

use super::json_result;

/// Input parameters for the sw_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncParams {
    /// Sync tag carried by the event.
    pub tag: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwSyncOutput {
    pub tag: String,
    pub handled: bool,
    pub report: Option<BatchReport>,
}

pub async fn sync_impl(router: &CacheRouter, params: SwSyncParams) -> Result<CallToolResult, McpError> {
    let report = router.sync(&params.tag).await;
    json_result(&SwSyncOutput { tag: params.tag, handled: report.is_some(), report })
}

#[cfg(test)]
mod tests {
    use super::super::testing::{result_json, test_router};
    use super::*;

    #[tokio::test]
    async fn test_unknown_tag_not_handled() {
        let router = test_router().await;

        let params = SwSyncParams { tag: "content-sync".into() };
        let output = result_json(&sync_impl(&router, params).await.unwrap());

        assert_eq!(output["handled"], false);
        assert!(output["report"].is_null());
        assert!(router.db().partition_names().await.unwrap().is_empty());
    }
}
