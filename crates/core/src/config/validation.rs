//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

/// A route or endpoint is either root-relative or an absolute http(s) URL.
fn is_request_path(entry: &str) -> bool {
    entry.starts_with('/') || entry.starts_with("http://") || entry.starts_with("https://")
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an absolute http(s) URL
    /// - `version` is empty or contains whitespace
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` or `sync_tag` is empty
    /// - a pre-cache route, sync endpoint or the offline document is not a request path
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = url::Url::parse(&self.origin).map_err(|e| invalid("origin", e.to_string()))?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", format!("unsupported scheme: {}", origin.scheme())));
        }

        if self.version.is_empty() {
            return Err(invalid("version", "must not be empty"));
        }
        if self.version.chars().any(char::is_whitespace) {
            return Err(invalid("version", "must not contain whitespace"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.sync_tag.is_empty() {
            return Err(invalid("sync_tag", "must not be empty"));
        }

        if let Some(route) = self.precache_routes.iter().find(|r| !is_request_path(r)) {
            return Err(invalid("precache_routes", format!("not a request path: {route}")));
        }
        if let Some(endpoint) = self.sync_endpoints.iter().find(|e| !is_request_path(e)) {
            return Err(invalid("sync_endpoints", format!("not a request path: {endpoint}")));
        }
        if !is_request_path(&self.offline_document) {
            return Err(invalid("offline_document", format!("not a request path: {}", self.offline_document)));
        }

        if self.sync_endpoints.is_empty() {
            tracing::warn!("sync_endpoints is empty; background sync will do nothing");
        }

        Ok(())
    }
}
