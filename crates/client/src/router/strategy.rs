//! Strategy executors.
//!
//! Each executor is one fetch/cache algorithm. Cache read errors degrade to
//! a miss and cache write errors are logged; neither fails the request.

use std::sync::Arc;

use folio_core::Error;

use super::{CacheRouter, ResponseSource, RoutedResponse, Strategy};
use crate::fetch::{FetchRequest, FetchResponse};

impl CacheRouter {
    /// Look up a request in a partition, treating store errors as a miss.
    pub(crate) async fn lookup(&self, partition: &str, request: &FetchRequest, key_url: &str) -> Option<FetchResponse> {
        let entry = match self.db.match_entry(partition, request.method.as_str(), key_url).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                tracing::debug!(partition, "cache miss for {}", key_url);
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, partition, "cache lookup failed, treating as miss");
                return None;
            }
        };

        match FetchResponse::from_entry(&entry) {
            Ok(response) => {
                tracing::debug!(partition, "cache hit for {}", key_url);
                Some(response)
            }
            Err(e) => {
                tracing::warn!(error = %e, partition, "unreadable cache entry, treating as miss");
                None
            }
        }
    }

    /// Store a copy of a 2xx response. Other statuses are never stored.
    pub(crate) async fn store(&self, partition: &str, request: &FetchRequest, key_url: &str, response: &FetchResponse) {
        if !response.is_success() {
            tracing::debug!(status = response.status.as_u16(), "not caching {}", key_url);
            return;
        }

        if let Err(e) = self.db.put_entry(partition, response.to_stored(&request.method, key_url)).await {
            tracing::warn!(error = %e, partition, "failed to populate cache for {}", key_url);
        }
    }

    /// Static partition first; on a miss fetch and keep a copy.
    pub(crate) async fn cache_first(&self, request: &FetchRequest, key_url: &str) -> Result<RoutedResponse, Error> {
        let partition = &self.partitions.static_name;

        if let Some(cached) = self.lookup(partition, request, key_url).await {
            return Ok(RoutedResponse::new(cached, ResponseSource::Cache, Strategy::CacheFirst));
        }

        let response = self.fetcher.fetch(request).await?;
        self.store(partition, request, key_url, &response).await;

        Ok(RoutedResponse::new(response, ResponseSource::Network, Strategy::CacheFirst))
    }

    /// Network first; on a transport failure fall back to the dynamic partition.
    pub(crate) async fn network_first(&self, request: &FetchRequest, key_url: &str) -> Result<RoutedResponse, Error> {
        let partition = &self.partitions.dynamic_name;

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                self.store(partition, request, key_url, &response).await;
                Ok(RoutedResponse::new(response, ResponseSource::Network, Strategy::NetworkFirst))
            }
            Err(err) => match self.lookup(partition, request, key_url).await {
                Some(cached) => {
                    tracing::debug!(error = %err, "network failed, serving cached {}", key_url);
                    Ok(RoutedResponse::new(cached, ResponseSource::CacheFallback, Strategy::NetworkFirst))
                }
                None => Err(err),
            },
        }
    }

    /// Dynamic partition immediately, refreshed by a detached task; fetch
    /// synchronously only on a miss.
    pub(crate) async fn stale_while_revalidate(
        &self, request: &FetchRequest, key_url: &str,
    ) -> Result<RoutedResponse, Error> {
        let partition = &self.partitions.dynamic_name;

        if let Some(cached) = self.lookup(partition, request, key_url).await {
            self.spawn_refresh(request.clone(), key_url.to_string());
            return Ok(RoutedResponse::new(cached, ResponseSource::Cache, Strategy::StaleWhileRevalidate));
        }

        let response = self.fetcher.fetch(request).await?;
        self.store(partition, request, key_url, &response).await;

        Ok(RoutedResponse::new(response, ResponseSource::Network, Strategy::StaleWhileRevalidate))
    }

    /// Refresh a dynamic entry in the background. Failures are discarded.
    fn spawn_refresh(&self, request: FetchRequest, key_url: String) {
        let db = self.db.clone();
        let fetcher = Arc::clone(&self.fetcher);
        let partition = self.partitions.dynamic_name.clone();

        tokio::spawn(async move {
            let response = match fetcher.fetch(&request).await {
                Ok(response) if response.is_success() => response,
                Ok(response) => {
                    tracing::debug!(status = response.status.as_u16(), "background refresh not stored for {}", key_url);
                    return;
                }
                Err(e) => {
                    tracing::debug!(error = %e, "background refresh failed for {}", key_url);
                    return;
                }
            };

            if let Err(e) = db.put_entry(&partition, response.to_stored(&request.method, &key_url)).await {
                tracing::debug!(error = %e, "background refresh could not store {}", key_url);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::super::testing::{ScriptedFetcher, router_with};
    use super::*;

    const WAIT: Duration = Duration::from_secs(2);

    fn stored(url: &str, body: &str) -> folio_core::StoredResponse {
        folio_core::StoredResponse {
            method: "GET".into(),
            url: url.into(),
            status_code: 200,
            headers: vec![("content-type".into(), "text/plain".into())],
            body: body.as_bytes().to_vec(),
        }
    }

    async fn body_of(router: &CacheRouter, partition: &str, url: &str) -> Option<Vec<u8>> {
        router
            .db
            .match_entry(partition, "GET", url)
            .await
            .unwrap()
            .map(|entry| entry.response.body)
    }

    #[tokio::test]
    async fn test_cache_first_miss_fetches_once_and_stores() {
        let fetcher = ScriptedFetcher::new().respond("https://folio.example/app.js", 200, "console.log(1)");
        let (router, fetcher) = router_with(fetcher).await;

        let request = FetchRequest::get(router.resolve("/app.js").unwrap());
        let routed = router.handle_fetch(&request).await.unwrap();

        assert_eq!(routed.source, ResponseSource::Network);
        assert_eq!(routed.strategy, Some(Strategy::CacheFirst));
        assert_eq!(fetcher.call_count(), 1);
        // stored before the response was handed back
        assert_eq!(
            body_of(&router, "static-v1", "https://folio.example/app.js").await.as_deref(),
            Some(&b"console.log(1)"[..])
        );

        let again = router.handle_fetch(&request).await.unwrap();
        assert_eq!(again.source, ResponseSource::Cache);
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cache_first_does_not_store_errors() {
        let fetcher = ScriptedFetcher::new().respond("https://folio.example/missing.png", 404, "nope");
        let (router, fetcher) = router_with(fetcher).await;

        let request = FetchRequest::get(router.resolve("/missing.png").unwrap());
        let routed = router.handle_fetch(&request).await.unwrap();

        assert_eq!(routed.response.status.as_u16(), 404);
        assert_eq!(fetcher.call_count(), 1);
        assert!(body_of(&router, "static-v1", "https://folio.example/missing.png").await.is_none());
    }

    #[tokio::test]
    async fn test_cache_first_network_failure_without_entry() {
        let (router, _fetcher) = router_with(ScriptedFetcher::new()).await;

        let request = FetchRequest::get(router.resolve("/font.woff2").unwrap());
        let err = router.handle_fetch(&request).await.unwrap_err();
        assert!(err.is_network());
    }

    #[tokio::test]
    async fn test_network_first_stores_success() {
        let fetcher = ScriptedFetcher::new().respond("https://folio.example/api/weather", 200, "{\"temp\":21}");
        let (router, _fetcher) = router_with(fetcher).await;

        let request = FetchRequest::get(router.resolve("/api/weather").unwrap());
        let routed = router.handle_fetch(&request).await.unwrap();

        assert_eq!(routed.source, ResponseSource::Network);
        assert_eq!(routed.strategy, Some(Strategy::NetworkFirst));
        assert!(body_of(&router, "dynamic-v1", "https://folio.example/api/weather").await.is_some());
    }

    #[tokio::test]
    async fn test_network_first_falls_back_to_cache() {
        let (router, _fetcher) = router_with(ScriptedFetcher::new()).await;
        router
            .db
            .put_entry("dynamic-v1", stored("https://folio.example/api/now-playing", "cached"))
            .await
            .unwrap();

        let request = FetchRequest::get(router.resolve("/api/now-playing").unwrap());
        let routed = router.handle_fetch(&request).await.unwrap();

        assert_eq!(routed.source, ResponseSource::CacheFallback);
        assert_eq!(&routed.response.bytes[..], b"cached");
    }

    #[tokio::test]
    async fn test_network_first_failure_without_entry_propagates() {
        let (router, fetcher) = router_with(ScriptedFetcher::new()).await;

        let request = FetchRequest::get(router.resolve("/api/top-tracks").unwrap());
        let err = router.handle_fetch(&request).await.unwrap_err();

        assert!(err.is_network());
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_network_first_http_error_is_returned_not_fallen_back() {
        let fetcher = ScriptedFetcher::new().respond("https://folio.example/api/weather", 503, "down");
        let (router, _fetcher) = router_with(fetcher).await;
        router
            .db
            .put_entry("dynamic-v1", stored("https://folio.example/api/weather", "cached"))
            .await
            .unwrap();

        let request = FetchRequest::get(router.resolve("/api/weather").unwrap());
        let routed = router.handle_fetch(&request).await.unwrap();

        assert_eq!(routed.source, ResponseSource::Network);
        assert_eq!(routed.response.status.as_u16(), 503);
        assert_eq!(
            body_of(&router, "dynamic-v1", "https://folio.example/api/weather").await.as_deref(),
            Some(&b"cached"[..])
        );
    }

    #[tokio::test]
    async fn test_swr_hit_returns_without_waiting_for_network() {
        let fetcher = ScriptedFetcher::new().gated().fail("https://folio.example/music");
        let (router, fetcher) = router_with(fetcher).await;
        router
            .db
            .put_entry("dynamic-v1", stored("https://folio.example/music", "stale"))
            .await
            .unwrap();

        let request = FetchRequest::navigate(router.resolve("/music").unwrap());
        let routed = tokio::time::timeout(WAIT, router.handle_fetch(&request))
            .await
            .expect("cached response must not wait on the network")
            .unwrap();

        assert_eq!(routed.source, ResponseSource::Cache);
        assert_eq!(routed.strategy, Some(Strategy::StaleWhileRevalidate));
        assert_eq!(&routed.response.bytes[..], b"stale");

        tokio::time::timeout(WAIT, fetcher.wait_for_calls(1)).await.unwrap();
        fetcher.open_gate();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(fetcher.call_count(), 1);
        assert_eq!(
            body_of(&router, "dynamic-v1", "https://folio.example/music").await.as_deref(),
            Some(&b"stale"[..])
        );
    }

    #[tokio::test]
    async fn test_swr_hit_refreshes_entry_in_background() {
        let fetcher = ScriptedFetcher::new().respond("https://folio.example/projects", 200, "fresh");
        let (router, fetcher) = router_with(fetcher).await;
        router
            .db
            .put_entry("dynamic-v1", stored("https://folio.example/projects", "stale"))
            .await
            .unwrap();

        let request = FetchRequest::get(router.resolve("/projects").unwrap());
        let routed = router.handle_fetch(&request).await.unwrap();
        assert_eq!(&routed.response.bytes[..], b"stale");

        tokio::time::timeout(WAIT, fetcher.wait_for_calls(1)).await.unwrap();
        let mut refreshed = false;
        for _ in 0..100 {
            if body_of(&router, "dynamic-v1", "https://folio.example/projects").await.as_deref() == Some(&b"fresh"[..]) {
                refreshed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(refreshed);
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_swr_miss_fetches_synchronously() {
        let fetcher = ScriptedFetcher::new().respond("https://folio.example/", 200, "home");
        let (router, fetcher) = router_with(fetcher).await;

        let request = FetchRequest::navigate(router.resolve("/").unwrap());
        let routed = router.handle_fetch(&request).await.unwrap();

        assert_eq!(routed.source, ResponseSource::Network);
        assert_eq!(fetcher.call_count(), 1);
        assert_eq!(body_of(&router, "dynamic-v1", "https://folio.example/").await.as_deref(), Some(&b"home"[..]));
    }
}
