//! sw_activate tool implementation.
//!
//! Delivers the activate lifecycle signal: retires stale partitions and
//! claims clients.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde::Serialize;

use folio_client::{ActivateReport, CacheRouter, LifecycleStatus};

use super::json_result;

#[derive(Debug, Serialize)]
pub struct SwActivateOutput {
    #[serde(flatten)]
    pub report: ActivateReport,
    pub status: LifecycleStatus,
}

pub async fn activate_impl(router: &CacheRouter) -> Result<CallToolResult, McpError> {
    let report = router.activate().await?;
    let status = router.status().await;
    json_result(&SwActivateOutput { report, status })
}
