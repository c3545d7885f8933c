//! Batch caching for background sync and `CACHE_URLS` messages.
//!
//! Each URL is fetched and, on a 2xx status, stored into the dynamic
//! partition. A failing item is logged and reported; it never stops the
//! rest of the batch.

use serde::{Deserialize, Serialize};

use folio_core::Error;

use super::CacheRouter;
use crate::fetch::FetchRequest;

/// Result of caching one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum BatchOutcome {
    Stored,
    /// Fetched, but the status was not 2xx.
    NotStored { status: u16 },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    pub url: String,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

/// Per-item outcomes of a batch, in input order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
    pub stored: usize,
    pub failed: usize,
}

impl BatchReport {
    fn push(&mut self, url: String, outcome: BatchOutcome) {
        match outcome {
            BatchOutcome::Stored => self.stored += 1,
            BatchOutcome::Failed { .. } => self.failed += 1,
            BatchOutcome::NotStored { .. } => {}
        }
        self.items.push(BatchItem { url, outcome });
    }
}

impl CacheRouter {
    /// Fetch each URL and store successful responses in the dynamic partition.
    pub async fn cache_urls(&self, urls: &[String]) -> BatchReport {
        let mut report = BatchReport::default();

        for url in urls {
            let outcome = match self.cache_one(url).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to cache {}", url);
                    BatchOutcome::Failed { error: e.to_string() }
                }
            };
            report.push(url.clone(), outcome);
        }

        tracing::debug!(stored = report.stored, failed = report.failed, "batch cached");
        report
    }

    async fn cache_one(&self, target: &str) -> Result<BatchOutcome, Error> {
        let request = FetchRequest::get(self.resolve(target)?);
        let key_url = request.cache_url()?;
        let response = self.fetcher.fetch(&request).await?;

        if !response.is_success() {
            tracing::warn!(status = response.status.as_u16(), "not caching {}", key_url);
            return Ok(BatchOutcome::NotStored { status: response.status.as_u16() });
        }

        self.db
            .put_entry(&self.partitions.dynamic_name, response.to_stored(&request.method, &key_url))
            .await?;
        Ok(BatchOutcome::Stored)
    }

    /// Handle a sync event. Only the configured tag refreshes the API endpoints;
    /// any other tag returns `None`.
    pub async fn sync(&self, tag: &str) -> Option<BatchReport> {
        if tag != self.config.sync_tag {
            tracing::debug!(tag, "ignoring sync event");
            return None;
        }

        tracing::info!(tag, endpoints = self.config.sync_endpoints.len(), "background sync");
        Some(self.cache_urls(&self.config.sync_endpoints).await)
    }
}
