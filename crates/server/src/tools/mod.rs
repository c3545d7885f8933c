//! MCP tool implementations.
//!
//! This module contains all tools exposed by the folio-sw server. Each tool
//! maps one host event onto the router and answers with pretty JSON.

pub mod cache;
pub mod sw_activate;
pub mod sw_fetch;
pub mod sw_install;
pub mod sw_message;
pub mod sw_sync;

pub use sw_fetch::SwFetchParams;
pub use sw_message::SwMessageParams;
pub use sw_sync::SwSyncParams;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

/// Render a tool output as a single pretty-printed JSON text block.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(|e| ToolError::SerializeFailed(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use async_trait::async_trait;
    use folio_client::{CacheRouter, FetchRequest, FetchResponse, Fetcher, RouterConfig};
    use folio_core::{AppConfig, BuildManifest, CacheDb, Error, StoredResponse};
    use rmcp::model::CallToolResult;

    /// A network that is always down.
    pub(crate) struct OfflineFetcher;

    #[async_trait]
    impl Fetcher for OfflineFetcher {
        async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
            Err(Error::Network(format!("{}: offline", request.url)))
        }
    }

    /// Router over an in-memory store with no network, so only
    /// cache-served paths succeed.
    pub(crate) async fn test_router() -> CacheRouter {
        let config = AppConfig { origin: "https://folio.example".into(), version: "v1".into(), ..Default::default() };
        let manifest = BuildManifest { version: Some("v1".into()), ..Default::default() };
        let db = CacheDb::open_in_memory().await.unwrap();
        CacheRouter::new(db, Arc::new(OfflineFetcher), RouterConfig::from_app(&config, manifest).unwrap())
    }

    pub(crate) fn stored(url: &str, body: &str) -> StoredResponse {
        StoredResponse {
            method: "GET".into(),
            url: url.into(),
            status_code: 200,
            headers: vec![("content-type".into(), "text/plain".into())],
            body: body.as_bytes().to_vec(),
        }
    }

    /// Parse the JSON text block of a tool result.
    pub(crate) fn result_json(result: &CallToolResult) -> serde_json::Value {
        let text = result
            .content
            .first()
            .and_then(|c| c.as_text())
            .expect("Expected text content");
        serde_json::from_str(&text.text).unwrap()
    }
}
