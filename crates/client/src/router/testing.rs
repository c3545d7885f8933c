//! Scripted network for router tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{StatusCode, header};
use tokio::sync::{Notify, Semaphore};

use folio_core::{AppConfig, BuildManifest, CacheDb, Error};

use super::{CacheRouter, RouterConfig};
use crate::fetch::{FetchRequest, FetchResponse, Fetcher};

pub(crate) const ORIGIN: &str = "https://folio.example";

#[derive(Clone)]
enum Reply {
    Respond { status: u16, body: &'static str },
    Fail,
}

/// Answers from a fixed table; unknown URLs fail like a dropped connection.
pub(crate) struct ScriptedFetcher {
    replies: HashMap<String, Reply>,
    calls: Mutex<Vec<String>>,
    fetched: Notify,
    gate: Option<Semaphore>,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self { replies: HashMap::new(), calls: Mutex::new(Vec::new()), fetched: Notify::new(), gate: None }
    }

    pub(crate) fn respond(mut self, url: &str, status: u16, body: &'static str) -> Self {
        self.replies.insert(url.to_string(), Reply::Respond { status, body });
        self
    }

    pub(crate) fn fail(mut self, url: &str) -> Self {
        self.replies.insert(url.to_string(), Reply::Fail);
        self
    }

    /// Hold every fetch after it is recorded until [`Self::open_gate`].
    pub(crate) fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub(crate) fn open_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(64);
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) async fn wait_for_calls(&self, n: usize) {
        loop {
            let notified = self.fetched.notified();
            if self.call_count() >= n {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let url = request.url.as_str().to_string();
        self.calls.lock().unwrap().push(url.clone());
        self.fetched.notify_waiters();

        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.unwrap();
        }

        match self.replies.get(&url).cloned().unwrap_or(Reply::Fail) {
            Reply::Respond { status, body } => {
                let mut headers = header::HeaderMap::new();
                headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/plain"));
                Ok(FetchResponse::new(
                    request.url.clone(),
                    StatusCode::from_u16(status).unwrap(),
                    headers,
                    Bytes::from_static(body.as_bytes()),
                ))
            }
            Reply::Fail => Err(Error::Network(format!("{url}: connection refused"))),
        }
    }
}

/// Config for a `v1` build served from [`ORIGIN`].
pub(crate) fn test_config() -> AppConfig {
    AppConfig { origin: ORIGIN.into(), version: "v1".into(), ..Default::default() }
}

/// Router over an in-memory store with the given manifest.
pub(crate) async fn router_with_manifest(
    fetcher: ScriptedFetcher, manifest: BuildManifest,
) -> (CacheRouter, Arc<ScriptedFetcher>) {
    let db = CacheDb::open_in_memory().await.unwrap();
    let fetcher = Arc::new(fetcher);
    let config = RouterConfig::from_app(&test_config(), manifest).unwrap();
    let router = CacheRouter::new(db, fetcher.clone(), config);
    (router, fetcher)
}

/// Router for version `v1` with no manifest files and no pre-cache routes.
pub(crate) async fn router_with(fetcher: ScriptedFetcher) -> (CacheRouter, Arc<ScriptedFetcher>) {
    let manifest = BuildManifest { version: Some("v1".into()), ..Default::default() };
    router_with_manifest(fetcher, manifest).await
}
