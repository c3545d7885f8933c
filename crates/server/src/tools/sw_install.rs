//! sw_install tool implementation.
//!
//! Delivers the install lifecycle signal: pre-caches the build manifest into
//! the static partition.

use rmcp::{ErrorData as McpError, model::CallToolResult};

use folio_client::CacheRouter;

use super::json_result;

pub async fn install_impl(router: &CacheRouter) -> Result<CallToolResult, McpError> {
    let report = router.install().await?;
    json_result(&report)
}
