//! Worker lifecycle: install and activate.
//!
//! ```text
//! parsed ─install─► installing ─ok──► installed ─activate─► activating ─► activated
//!                        │
//!                        └─fail─► redundant   (activation refused; old worker keeps control)
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use folio_core::{Error, StoredResponse};

use super::CacheRouter;
use crate::fetch::{FetchRequest, Fetcher};

/// Lifecycle state of this worker version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    #[default]
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    state: WorkerState,
    skip_waiting: bool,
    clients_claimed: bool,
}

/// Snapshot of the lifecycle, for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleStatus {
    pub version: String,
    pub state: WorkerState,
    pub skip_waiting: bool,
    pub clients_claimed: bool,
}

/// Result of a successful install.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallReport {
    pub version: String,
    pub partition: String,
    /// Canonical URLs written into the static partition, in manifest order.
    pub cached: Vec<String>,
    pub skip_waiting: bool,
}

/// Result of an activation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivateReport {
    pub version: String,
    /// Stale partitions removed.
    pub deleted: Vec<String>,
    /// Partitions kept because they belong to this version.
    pub retained: Vec<String>,
    pub clients_claimed: bool,
}

impl CacheRouter {
    /// Current lifecycle snapshot.
    pub async fn status(&self) -> LifecycleStatus {
        let lifecycle = self.lifecycle.read().await;
        LifecycleStatus {
            version: self.config.manifest.version().to_string(),
            state: lifecycle.state,
            skip_waiting: lifecycle.skip_waiting,
            clients_claimed: lifecycle.clients_claimed,
        }
    }

    async fn transition(&self, state: WorkerState) {
        let mut lifecycle = self.lifecycle.write().await;
        tracing::info!(from = ?lifecycle.state, to = ?state, version = self.config.manifest.version(), "worker state");
        lifecycle.state = state;
    }

    /// Pre-cache the manifest files and routes into the static partition.
    ///
    /// All-or-nothing: every target must fetch with a 2xx status and the
    /// whole batch is written in one transaction. Any failure marks the
    /// worker redundant.
    ///
    /// A successful install sets the skip-waiting flag but stays
    /// `Installed`: the flag means activation will not wait for old clients,
    /// and activation itself still happens on the host's activate signal.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        {
            let mut lifecycle = self.lifecycle.write().await;
            if lifecycle.state != WorkerState::Parsed {
                return Err(Error::InvalidState(format!("cannot install a worker that is {:?}", lifecycle.state)));
            }
            lifecycle.state = WorkerState::Installing;
        }
        tracing::info!(version = self.config.manifest.version(), "installing worker");

        match self.precache().await {
            Ok(cached) => {
                {
                    let mut lifecycle = self.lifecycle.write().await;
                    lifecycle.state = WorkerState::Installed;
                    lifecycle.skip_waiting = true;
                }
                tracing::info!(entries = cached.len(), partition = %self.partitions.static_name, "static files cached");
                Ok(InstallReport {
                    version: self.config.manifest.version().to_string(),
                    partition: self.partitions.static_name.clone(),
                    cached,
                    skip_waiting: true,
                })
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to cache static files");
                self.transition(WorkerState::Redundant).await;
                Err(Error::InstallFailed(e.to_string()))
            }
        }
    }

    async fn precache(&self) -> Result<Vec<String>, Error> {
        let partition = &self.partitions.static_name;
        self.db.open_partition(partition).await?;

        let mut requests = Vec::new();
        for path in self.config.manifest.precache_paths() {
            let request = FetchRequest::get(self.resolve(&path)?);
            let key_url = request.cache_url()?;
            requests.push((request, key_url));
        }

        let mut join_set = JoinSet::new();
        for (index, (request, key_url)) in requests.into_iter().enumerate() {
            let fetcher: Arc<dyn Fetcher> = Arc::clone(&self.fetcher);
            join_set.spawn(async move {
                let result = fetcher.fetch(&request).await;
                (index, request, key_url, result)
            });
        }

        let mut fetched: Vec<(usize, StoredResponse)> = Vec::with_capacity(join_set.len());
        while let Some(joined) = join_set.join_next().await {
            let (index, request, key_url, result) = joined.map_err(|e| Error::Network(e.to_string()))?;
            let response = result?;
            if !response.is_success() {
                return Err(Error::HttpError(format!("{key_url}: status {}", response.status.as_u16())));
            }
            fetched.push((index, response.to_stored(&request.method, &key_url)));
        }
        fetched.sort_by_key(|(index, _)| *index);

        let responses: Vec<StoredResponse> = fetched.into_iter().map(|(_, stored)| stored).collect();
        let cached = responses.iter().map(|r| r.url.clone()).collect();
        self.db.put_entries(partition, responses).await?;

        Ok(cached)
    }

    /// Retire every partition that does not belong to this version, then
    /// claim all clients.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let previous = {
            let mut lifecycle = self.lifecycle.write().await;
            match lifecycle.state {
                WorkerState::Installed | WorkerState::Activated => {}
                WorkerState::Redundant => {
                    return Err(Error::InvalidState(
                        "install failed; the previous worker remains in control".to_string(),
                    ));
                }
                state => return Err(Error::InvalidState(format!("cannot activate a worker that is {state:?}"))),
            }
            let previous = lifecycle.state;
            lifecycle.state = WorkerState::Activating;
            previous
        };

        self.complete_activation(previous).await
    }

    /// Run cleanup for a worker already moved to `Activating`. On failure
    /// the worker goes back to `previous`.
    async fn complete_activation(&self, previous: WorkerState) -> Result<ActivateReport, Error> {
        tracing::info!(version = self.config.manifest.version(), "activating worker");

        let (deleted, retained) = match self.retire_stale_partitions().await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.transition(previous).await;
                return Err(e);
            }
        };

        {
            let mut lifecycle = self.lifecycle.write().await;
            lifecycle.state = WorkerState::Activated;
            lifecycle.clients_claimed = true;
        }
        tracing::info!(deleted = deleted.len(), "worker activated, clients claimed");

        Ok(ActivateReport {
            version: self.config.manifest.version().to_string(),
            deleted,
            retained,
            clients_claimed: true,
        })
    }

    async fn retire_stale_partitions(&self) -> Result<(Vec<String>, Vec<String>), Error> {
        let mut deleted = Vec::new();
        let mut retained = Vec::new();

        for name in self.db.partition_names().await? {
            if self.partitions.is_current(&name) {
                retained.push(name);
            } else {
                tracing::info!(partition = %name, "deleting old cache");
                self.db.delete_partition(&name).await?;
                deleted.push(name);
            }
        }

        Ok((deleted, retained))
    }

    /// Ask to take control without waiting for old clients to go away.
    ///
    /// A worker that is installed and waiting is activated on the spot. In
    /// any other state only the flag is set, so repeated requests never fail.
    pub async fn skip_waiting(&self) -> Result<Option<ActivateReport>, Error> {
        {
            let mut lifecycle = self.lifecycle.write().await;
            lifecycle.skip_waiting = true;
            if lifecycle.state != WorkerState::Installed {
                return Ok(None);
            }
            lifecycle.state = WorkerState::Activating;
        }

        self.complete_activation(WorkerState::Installed).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{ScriptedFetcher, router_with, router_with_manifest};
    use super::super::{ResponseSource, Strategy};
    use super::*;
    use folio_core::BuildManifest;

    fn manifest(version: &str, files: &[&str], routes: &[&str]) -> BuildManifest {
        BuildManifest {
            version: Some(version.into()),
            files: files.iter().map(|f| f.to_string()).collect(),
            routes: routes.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn stored(url: &str) -> StoredResponse {
        StoredResponse {
            method: "GET".into(),
            url: url.into(),
            status_code: 200,
            headers: Vec::new(),
            body: b"x".to_vec(),
        }
    }

    #[tokio::test]
    async fn test_install_then_fetch_served_from_static() {
        let fetcher = ScriptedFetcher::new()
            .respond("https://folio.example/a.js", 200, "export {}")
            .respond("https://folio.example/", 200, "<h1>home</h1>");
        let (router, fetcher) = router_with_manifest(fetcher, manifest("v1", &["/a.js"], &["/"])).await;

        let report = router.install().await.unwrap();
        assert_eq!(report.partition, "static-v1");
        assert_eq!(report.cached, vec!["https://folio.example/a.js", "https://folio.example/"]);
        assert!(report.skip_waiting);
        assert_eq!(
            router.db.entry_urls("static-v1").await.unwrap(),
            vec!["https://folio.example/a.js", "https://folio.example/"]
        );

        let calls_after_install = fetcher.call_count();
        let request = FetchRequest::get(router.resolve("/a.js").unwrap());
        let routed = router.handle_fetch(&request).await.unwrap();

        assert_eq!(routed.source, ResponseSource::Cache);
        assert_eq!(routed.strategy, Some(Strategy::CacheFirst));
        assert_eq!(&routed.response.bytes[..], b"export {}");
        assert_eq!(fetcher.call_count(), calls_after_install);

        let status = router.status().await;
        assert_eq!(status.state, WorkerState::Installed);
        assert!(status.skip_waiting);
    }

    #[tokio::test]
    async fn test_install_failure_writes_nothing_and_blocks_activation() {
        let fetcher = ScriptedFetcher::new()
            .respond("https://folio.example/a.js", 200, "export {}")
            .respond("https://folio.example/", 500, "boom");
        let (router, _fetcher) = router_with_manifest(fetcher, manifest("v1", &["/a.js"], &["/"])).await;

        let err = router.install().await.unwrap_err();
        assert!(matches!(err, Error::InstallFailed(msg) if msg.contains("status 500")));
        assert!(router.db.entry_urls("static-v1").await.unwrap().is_empty());
        assert_eq!(router.status().await.state, WorkerState::Redundant);

        let err = router.activate().await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_install_network_failure_is_install_failure() {
        let fetcher = ScriptedFetcher::new().respond("https://folio.example/a.js", 200, "export {}");
        let (router, _fetcher) = router_with_manifest(fetcher, manifest("v1", &["/a.js", "/b.css"], &[])).await;

        assert!(matches!(router.install().await, Err(Error::InstallFailed(_))));
    }

    #[tokio::test]
    async fn test_install_twice_rejected() {
        let (router, _fetcher) = router_with(ScriptedFetcher::new()).await;
        router.install().await.unwrap();
        assert!(matches!(router.install().await, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_activate_before_install_rejected() {
        let (router, _fetcher) = router_with(ScriptedFetcher::new()).await;
        assert!(matches!(router.activate().await, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_activate_retires_old_versions() {
        let (router, _fetcher) =
            router_with_manifest(ScriptedFetcher::new(), manifest("v2", &[], &[])).await;
        router.db.put_entry("static-v1", stored("https://folio.example/a.js")).await.unwrap();
        router.db.put_entry("dynamic-v1", stored("https://folio.example/api/weather")).await.unwrap();
        router.db.put_entry("static-v2", stored("https://folio.example/b.js")).await.unwrap();

        router.install().await.unwrap();
        let report = router.activate().await.unwrap();

        assert_eq!(report.deleted, vec!["static-v1", "dynamic-v1"]);
        assert_eq!(report.retained, vec!["static-v2"]);
        assert!(report.clients_claimed);
        assert_eq!(router.db.partition_names().await.unwrap(), vec!["static-v2"]);
        assert!(!router.db.has_partition("dynamic-v2").await.unwrap());

        router
            .db
            .put_entry(&router.partitions().dynamic_name, stored("https://folio.example/api/weather"))
            .await
            .unwrap();
        assert!(router.db.has_partition("dynamic-v2").await.unwrap());

        let status = router.status().await;
        assert_eq!(status.state, WorkerState::Activated);
        assert!(status.clients_claimed);
    }

    #[tokio::test]
    async fn test_activate_is_idempotent() {
        let (router, _fetcher) = router_with(ScriptedFetcher::new()).await;
        router.install().await.unwrap();
        router.activate().await.unwrap();

        let again = router.activate().await.unwrap();
        assert!(again.deleted.is_empty());
        assert_eq!(again.retained, vec!["static-v1"]);
    }

    #[tokio::test]
    async fn test_skip_waiting_promotes_installed_worker() {
        let (router, _fetcher) = router_with(ScriptedFetcher::new()).await;
        router.install().await.unwrap();

        let activation = router.skip_waiting().await.unwrap();
        assert!(activation.is_some());
        assert_eq!(router.status().await.state, WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_install_waits_for_activate_signal() {
        let (router, _fetcher) = router_with(ScriptedFetcher::new()).await;
        router.install().await.unwrap();

        let status = router.status().await;
        assert_eq!(status.state, WorkerState::Installed);
        assert!(status.skip_waiting);
        assert!(!status.clients_claimed);

        router.activate().await.unwrap();
        assert_eq!(router.status().await.state, WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_concurrent_skip_waiting_activates_once() {
        let (router, _fetcher) = router_with(ScriptedFetcher::new()).await;
        router.db.put_entry("static-v0", stored("https://folio.example/old.js")).await.unwrap();
        router.install().await.unwrap();

        let (first, second) = tokio::join!(router.skip_waiting(), router.skip_waiting());
        let activations: Vec<ActivateReport> =
            [first.unwrap(), second.unwrap()].into_iter().flatten().collect();

        assert_eq!(activations.len(), 1);
        assert_eq!(activations[0].deleted, vec!["static-v0"]);
        assert_eq!(router.status().await.state, WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_skip_waiting_after_activation_is_noop() {
        let (router, _fetcher) = router_with(ScriptedFetcher::new()).await;
        router.install().await.unwrap();
        router.activate().await.unwrap();

        assert!(router.skip_waiting().await.unwrap().is_none());
        assert_eq!(router.status().await.state, WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_skip_waiting_before_install_only_sets_flag() {
        let (router, _fetcher) = router_with(ScriptedFetcher::new()).await;

        assert!(router.skip_waiting().await.unwrap().is_none());
        let status = router.status().await;
        assert_eq!(status.state, WorkerState::Parsed);
        assert!(status.skip_waiting);
    }
}
