//! cache_get tool implementation.
//!
//! Retrieves a stored response by request URL.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use folio_client::{CacheRouter, FetchRequest};
use folio_core::Error;

use super::super::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Request URL; root-relative paths resolve against the configured origin.
    pub url: String,

    /// HTTP method the entry was stored under (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Partition to search. When omitted, every partition is searched,
    /// oldest first.
    #[serde(default)]
    pub partition: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize)]
pub struct CacheGetOutput {
    pub partition: String,
    pub key: String,
    pub stored_at: String,
    pub method: String,
    pub url: String,
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(router: &CacheRouter, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let key_url = FetchRequest::get(router.resolve(&params.url)?).cache_url()?;
    let method = params.method.to_ascii_uppercase();

    let entry = match &params.partition {
        Some(partition) => router.db().match_entry(partition, &method, &key_url).await?,
        None => router.db().match_any(&method, &key_url).await?,
    }
    .ok_or_else(|| Error::CacheMiss(format!("{method} {key_url}")))?;

    let stored = entry.response;
    json_result(&CacheGetOutput {
        partition: entry.partition,
        key: entry.key,
        stored_at: entry.stored_at,
        method: stored.method,
        url: stored.url,
        status_code: stored.status_code,
        headers: stored.headers,
        body: String::from_utf8_lossy(&stored.body).into_owned(),
    })
}
