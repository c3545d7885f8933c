//! URL resolution and canonicalization for consistent cache keys.

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a request target against the worker's origin.
///
/// Root-relative paths (`/a.js`) and bare relative paths join onto `origin`;
/// absolute URLs of any scheme are parsed as-is so the router can see and
/// skip non-HTTP requests.
pub fn resolve(origin: &url::Url, input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    match url::Url::parse(trimmed) {
        Ok(parsed) => Ok(parsed),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))
        }
        Err(e) => Err(UrlError::InvalidUrl(e.to_string())),
    }
}

/// Canonicalize an HTTP(S) URL for use as a cache key.
///
/// Normalization steps:
/// 1. Reject non-HTTP schemes
/// 2. Lowercase the host
/// 3. Remove fragment (#...)
/// 4. Keep query string intact (do not reorder)
pub fn canonicalize(url: &url::Url) -> Result<url::Url, UrlError> {
    let mut parsed = url.clone();

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        parsed
            .set_host(Some(&lowered))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Whether the URL uses a scheme the router intercepts.
pub fn is_http(url: &url::Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}
