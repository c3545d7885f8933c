//! cache_list tool implementation.
//!
//! Lists partitions with entry counts, and optionally their keys.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use folio_client::{CacheRouter, LifecycleStatus};

use super::super::json_result;

/// Parameters for the cache_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheListParams {
    /// Include each partition's entry URLs in storage order.
    #[serde(default)]
    pub include_keys: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartitionListing {
    pub name: String,
    pub created_at: String,
    pub entries: u64,
    /// `true` for the static or dynamic partition of the running version.
    pub current: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheListOutput {
    pub worker: LifecycleStatus,
    pub partitions: Vec<PartitionListing>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(router: &CacheRouter, params: CacheListParams) -> Result<CallToolResult, McpError> {
    let mut partitions = Vec::new();

    for info in router.db().partition_stats().await? {
        let keys = if params.include_keys { Some(router.db().entry_urls(&info.name).await?) } else { None };
        partitions.push(PartitionListing {
            current: router.partitions().is_current(&info.name),
            name: info.name,
            created_at: info.created_at,
            entries: info.entries,
            keys,
        });
    }

    json_result(&CacheListOutput { worker: router.status().await, partitions })
}
