//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (FOLIO_SW_*)
//! 2. TOML config file (if FOLIO_SW_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (FOLIO_SW_*)
/// 2. TOML config file (if FOLIO_SW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin the worker is scoped to. Root-relative paths resolve against it.
    ///
    /// Set via FOLIO_SW_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to SQLite cache database.
    ///
    /// Set via FOLIO_SW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Build version token used to name cache partitions.
    ///
    /// Overridden by the manifest's own version when a manifest is loaded.
    #[serde(default = "default_version")]
    pub version: String,

    /// Build manifest (JSON) listing the asset files to pre-cache.
    #[serde(default)]
    pub manifest_path: Option<PathBuf>,

    /// Top-level routes pre-cached alongside the manifest files.
    #[serde(default = "default_precache_routes")]
    pub precache_routes: Vec<String>,

    /// Tag that triggers the background sync agent.
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,

    /// API endpoints refreshed on background sync.
    #[serde(default = "default_sync_endpoints")]
    pub sync_endpoints: Vec<String>,

    /// Document served from the static partition when a navigation fails.
    #[serde(default = "default_offline_document")]
    pub offline_document: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via FOLIO_SW_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via FOLIO_SW_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via FOLIO_SW_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_origin() -> String {
    "http://localhost:4173".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./folio-sw-cache.sqlite")
}

fn default_version() -> String {
    "dev".into()
}

fn default_precache_routes() -> Vec<String> {
    vec!["/".into(), "/projects".into(), "/music".into()]
}

fn default_sync_tag() -> String {
    "api-sync".into()
}

fn default_sync_endpoints() -> Vec<String> {
    vec!["/api/now-playing".into(), "/api/top-tracks".into(), "/api/weather".into()]
}

fn default_offline_document() -> String {
    "/offline.html".into()
}

fn default_user_agent() -> String {
    "folio-sw/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            db_path: default_db_path(),
            version: default_version(),
            manifest_path: None,
            precache_routes: default_precache_routes(),
            sync_tag: default_sync_tag(),
            sync_endpoints: default_sync_endpoints(),
            offline_document: default_offline_document(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `FOLIO_SW_`
    /// 2. TOML file from `FOLIO_SW_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment()
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("FOLIO_SW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("FOLIO_SW_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }
}
