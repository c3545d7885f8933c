//! sw_fetch tool implementation.
//!
//! Delivers one intercepted fetch to the router and reports the response
//! together with the strategy and source that produced it.

use chrono::Utc;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use folio_client::{CacheRouter, FetchRequest, Method, ResponseSource, RoutedResponse, Strategy};

use super::json_result;
use crate::error::ToolError;

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Request URL; root-relative paths resolve against the configured origin.
    pub url: String,

    /// HTTP method (default: GET). Only GET is intercepted.
    #[serde(default = "default_method")]
    pub method: String,

    /// Whether this is a top-level page navigation.
    #[serde(default)]
    pub navigate: bool,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the sw_fetch tool.
#[derive(Debug, Clone, Serialize)]
pub struct SwFetchOutput {
    pub url: String,
    pub status: u16,
    pub source: ResponseSource,
    /// `None` when the request was not intercepted.
    pub strategy: Option<Strategy>,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
    pub bytes: usize,
    pub fetch_ms: u64,
    pub served_at: String,
}

impl From<RoutedResponse> for SwFetchOutput {
    fn from(routed: RoutedResponse) -> Self {
        let response = routed.response;
        let headers = response
            .headers
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
            .collect();

        Self {
            url: response.url.to_string(),
            status: response.status.as_u16(),
            source: routed.source,
            strategy: routed.strategy,
            content_type: response.content_type,
            headers,
            body: String::from_utf8_lossy(&response.bytes).into_owned(),
            bytes: response.bytes.len(),
            fetch_ms: response.fetch_ms,
            served_at: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        }
    }
}

pub async fn fetch_impl(router: &CacheRouter, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(ToolError::InvalidInput("url cannot be empty".into()).into());
    }

    let method = Method::from_bytes(params.method.to_ascii_uppercase().as_bytes())
        .map_err(|_| ToolError::InvalidInput(format!("invalid method: {}", params.method)))?;

    let request = FetchRequest { method, url: router.resolve(&params.url)?, navigate: params.navigate };
    let routed = router.handle_fetch(&request).await?;

    json_result(&SwFetchOutput::from(routed))
}
