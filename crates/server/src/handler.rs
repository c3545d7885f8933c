//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{
    SwFetchParams, SwMessageParams, SwSyncParams,
    cache::{CacheGetParams, CacheListParams, get_impl, list_impl},
    sw_activate::activate_impl,
    sw_fetch::fetch_impl,
    sw_install::install_impl,
    sw_message::message_impl,
    sw_sync::sync_impl,
};

use folio_client::CacheRouter;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for folio-sw.
#[derive(Clone)]
pub struct FolioSwServer {
    router: Arc<CacheRouter>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl FolioSwServer {
    /// Create a new server handler around a cache router.
    pub fn new(router: Arc<CacheRouter>) -> Self {
        Self { router, tool_router: Self::tool_router() }
    }

    #[tool(description = "Install lifecycle signal. Pre-caches the build manifest files and top-level routes into \
                          the static partition; any failure makes this worker version redundant.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.router).await
    }

    #[tool(description = "Activate lifecycle signal. Deletes cache partitions from other build versions and \
                          claims all clients.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.router).await
    }

    /// Route one request through the cache strategies.
    #[tool(description = "Intercepted fetch. Serves a request cache-first, network-first or \
                          stale-while-revalidate depending on its URL, and reports which path answered.")]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.router, params.0).await
    }

    #[tool(description = "Background sync event. The configured tag refreshes the API endpoints into the \
                          dynamic partition; other tags are ignored.")]
    async fn sw_sync(&self, params: Parameters<SwSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.router, params.0).await
    }

    #[tool(description = "Control message from a page. SKIP_WAITING promotes an installed worker; CACHE_URLS \
                          stores the given URLs in the dynamic partition. Unknown types are ignored.")]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.router, params.0).await
    }

    #[tool(description = "Look up a stored response by URL, in one partition or across all of them.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.router, params.0).await
    }

    #[tool(description = "List cache partitions with entry counts and the worker's lifecycle state.")]
    async fn cache_list(&self, params: Parameters<CacheListParams>) -> Result<CallToolResult, McpError> {
        list_impl(&self.router, params.0).await
    }
}

impl ServerHandler for FolioSwServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "folio-sw".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
