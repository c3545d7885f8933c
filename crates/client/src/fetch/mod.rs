//! HTTP fetch pipeline used by every strategy executor.
//!
//! ### Requests
//! - Targets resolve against the worker origin (`/a.js` -> `https://site/a.js`)
//! - Cache keys use the canonical URL: lowercase host, no fragment
//!
//! ### Responses
//! - Any HTTP status is a response; only transport failures are errors.
//!   Strategies decide what a non-2xx means.
//! - Max body bytes: 5MB (configurable)
//! - Max redirects: 5

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode, Url, header};
use std::time::{Duration, Instant};

pub use reqwest::Method;
pub use url::{UrlError, canonicalize, is_http, resolve};

use folio_core::{AppConfig, CacheEntry, Error, StoredResponse};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "folio-sw/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "folio-sw/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    /// Fetch settings taken from the application configuration.
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Self::default()
        }
    }
}

/// A request as seen by the router.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    /// Top-level page navigation, eligible for the offline document.
    pub navigate: bool,
}

impl FetchRequest {
    /// A plain subresource GET.
    pub fn get(url: Url) -> Self {
        Self { method: Method::GET, url, navigate: false }
    }

    /// A page navigation GET.
    pub fn navigate(url: Url) -> Self {
        Self { method: Method::GET, url, navigate: true }
    }

    /// Canonical URL string used for the cache key.
    pub fn cache_url(&self) -> Result<String, Error> {
        canonicalize(&self.url)
            .map(String::from)
            .map_err(|e| Error::InvalidUrl(e.to_string()))
    }
}

/// Response from a fetch operation or a cache lookup.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL the response belongs to
    pub url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Time taken to fetch in milliseconds (0 when served from cache)
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Build a response from parts, deriving `content_type` from the headers.
    pub fn new(url: Url, status: StatusCode, headers: header::HeaderMap, bytes: Bytes) -> Self {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        Self { url, status, content_type, bytes, headers, fetch_ms: 0 }
    }

    /// Whether the status is 2xx, the condition for storing a copy.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Capture a copy of this response for storage under `cache_url`.
    pub fn to_stored(&self, method: &Method, cache_url: &str) -> StoredResponse {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| match value.to_str() {
                Ok(value) => Some((name.as_str().to_string(), value.to_string())),
                Err(_) => {
                    tracing::debug!(header = %name, "not storing non-UTF-8 header for {}", cache_url);
                    None
                }
            })
            .collect();

        StoredResponse {
            method: method.as_str().to_string(),
            url: cache_url.to_string(),
            status_code: self.status.as_u16(),
            headers,
            body: self.bytes.to_vec(),
        }
    }

    /// Rebuild a response from a stored entry.
    pub fn from_entry(entry: &CacheEntry) -> Result<Self, Error> {
        let stored = &entry.response;
        let url = Url::parse(&stored.url).map_err(|e| Error::CorruptEntry(format!("{}: {e}", stored.url)))?;
        let status = StatusCode::from_u16(stored.status_code)
            .map_err(|e| Error::CorruptEntry(format!("{}: {e}", stored.url)))?;

        let mut headers = header::HeaderMap::with_capacity(stored.headers.len());
        for (name, value) in &stored.headers {
            let name = header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::CorruptEntry(format!("{}: header {name}: {e}", stored.url)))?;
            let value = header::HeaderValue::from_str(value)
                .map_err(|e| Error::CorruptEntry(format!("{}: header {name}: {e}", stored.url)))?;
            headers.append(name, value);
        }

        Ok(Self::new(url, status, headers, Bytes::from(stored.body.clone())))
    }
}

/// Source of network responses.
///
/// The router only ever talks to the network through this trait so strategy
/// behaviour can be exercised without sockets.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform the request. Non-2xx statuses are `Ok`; transport failures are `Err`.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error>;
}

/// HTTP fetch client backed by reqwest.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }
}

fn transport_error(url: &Url, err: &reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(format!("{url}: {err}"))
    } else {
        Error::Network(format!("{url}: {err}"))
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let url = request.url.clone();

        let response = self
            .http
            .request(request.method.clone(), url.clone())
            .send()
            .await
            .map_err(|e| transport_error(&url, &e))?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let headers = response.headers().clone();
        let bytes = response.bytes().await.map_err(|e| transport_error(&url, &e))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        let mut fetched = FetchResponse::new(url, status, headers, bytes);
        fetched.fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            fetched.url,
            status.as_u16(),
            fetched.fetch_ms,
            fetched.bytes.len()
        );

        Ok(fetched)
    }
}
