//! Offline cache router.
//!
//! Sits between the site's pages and the network and decides, per request,
//! whether to answer from a cache partition, the network, or both.
//!
//! ```text
//!   request ──► intercept? ──no──► network (pass-through)
//!                  │yes
//!                  ▼
//!             classify path
//!     ┌────────────┼─────────────────┐
//!     ▼            ▼                 ▼
//! cache-first  network-first  stale-while-revalidate
//!  (static)     (dynamic)          (dynamic)
//!     └────────────┼─────────────────┘
//!                  ▼ failure on a navigation
//!          offline document (static)
//! ```
//!
//! Besides fetch routing, the router owns the worker lifecycle (install,
//! activate), the background sync agent and the control-message listener.

pub mod batch;
pub mod classify;
pub mod lifecycle;
pub mod message;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use folio_core::{AppConfig, BuildManifest, CacheDb, Error, PartitionNames};

use crate::fetch::{FetchRequest, FetchResponse, Fetcher, is_http, resolve};

pub use batch::{BatchItem, BatchOutcome, BatchReport};
pub use classify::{RequestClass, Strategy, select_strategy};
pub use lifecycle::{ActivateReport, InstallReport, LifecycleStatus, WorkerState};
pub use message::{ControlMessage, MessageOutcome};

/// Router settings resolved from configuration and the build manifest.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub origin: Url,
    pub manifest: BuildManifest,
    pub offline_document: String,
    pub sync_tag: String,
    pub sync_endpoints: Vec<String>,
}

impl RouterConfig {
    pub fn from_app(config: &AppConfig, manifest: BuildManifest) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;
        Ok(Self {
            origin,
            manifest,
            offline_document: config.offline_document.clone(),
            sync_tag: config.sync_tag.clone(),
            sync_endpoints: config.sync_endpoints.clone(),
        })
    }
}

/// Where a routed response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseSource {
    Network,
    Cache,
    /// Served from the dynamic partition after the network failed.
    CacheFallback,
    /// The offline document, after a navigation failed.
    Offline,
    /// Not intercepted; fetched without touching any partition.
    Passthrough,
}

/// A response together with how it was obtained.
#[derive(Debug, Clone)]
pub struct RoutedResponse {
    pub response: FetchResponse,
    pub source: ResponseSource,
    /// `None` for requests the router does not intercept.
    pub strategy: Option<Strategy>,
}

impl RoutedResponse {
    fn new(response: FetchResponse, source: ResponseSource, strategy: Strategy) -> Self {
        Self { response, source, strategy: Some(strategy) }
    }
}

/// The offline cache router for one build version.
pub struct CacheRouter {
    pub(crate) db: CacheDb,
    pub(crate) fetcher: Arc<dyn Fetcher>,
    pub(crate) config: RouterConfig,
    pub(crate) partitions: PartitionNames,
    pub(crate) lifecycle: RwLock<lifecycle::Lifecycle>,
}

impl CacheRouter {
    pub fn new(db: CacheDb, fetcher: Arc<dyn Fetcher>, config: RouterConfig) -> Self {
        let partitions = PartitionNames::for_version(config.manifest.version());
        Self { db, fetcher, config, partitions, lifecycle: RwLock::new(lifecycle::Lifecycle::default()) }
    }

    /// Partition identifiers for this router's build version.
    pub fn partitions(&self) -> &PartitionNames {
        &self.partitions
    }

    /// The partition store.
    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    /// Resolve a request target against the origin.
    pub fn resolve(&self, target: &str) -> Result<Url, Error> {
        resolve(&self.config.origin, target).map_err(|e| Error::InvalidUrl(format!("{target}: {e}")))
    }

    /// Only GET requests over http(s) are intercepted.
    pub fn intercepts(request: &FetchRequest) -> bool {
        request.method == Method::GET && is_http(&request.url)
    }

    /// Answer a request.
    ///
    /// Intercepted requests go through the strategy their URL selects. When
    /// that strategy fails for a navigation, the offline document from the
    /// static partition is served instead if one was pre-cached.
    pub async fn handle_fetch(&self, request: &FetchRequest) -> Result<RoutedResponse, Error> {
        if !Self::intercepts(request) {
            tracing::debug!("not intercepting {} {}", request.method, request.url);
            let response = self.fetcher.fetch(request).await?;
            return Ok(RoutedResponse { response, source: ResponseSource::Passthrough, strategy: None });
        }

        let key_url = request.cache_url()?;
        let strategy = select_strategy(&request.url);
        tracing::debug!(?strategy, "routing {}", key_url);

        let result = match strategy {
            Strategy::CacheFirst => self.cache_first(request, &key_url).await,
            Strategy::NetworkFirst => self.network_first(request, &key_url).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request, &key_url).await,
        };

        match result {
            Ok(routed) => Ok(routed),
            Err(err) if request.navigate => match self.offline_document().await {
                Some(response) => {
                    tracing::debug!(error = %err, "serving offline document for {}", key_url);
                    Ok(RoutedResponse::new(response, ResponseSource::Offline, strategy))
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    async fn offline_document(&self) -> Option<FetchResponse> {
        let url = match self.resolve(&self.config.offline_document) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, "offline document path does not resolve");
                return None;
            }
        };
        let request = FetchRequest::get(url);
        let key_url = request.cache_url().ok()?;
        self.lookup(&self.partitions.static_name, &request, &key_url).await
    }
}
