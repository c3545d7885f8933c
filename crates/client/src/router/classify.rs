//! Request classification.
//!
//! Maps a URL to its [`RequestClass`] and the class to the [`Strategy`] that
//! serves it. Pure and total: every URL lands in exactly one class.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

static STATIC_ASSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.(js|css|png|jpg|jpeg|gif|svg|woff|woff2|ttf|ico)$").expect("static asset pattern is valid")
});

const API_PREFIX: &str = "/api/";

const PAGE_PREFIXES: &[&str] = &["/projects", "/music", "/static/"];

/// Shape of a request, decided from its path alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestClass {
    StaticAsset,
    Api,
    Page,
    Other,
}

/// How a request is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Static partition first, network on miss.
    CacheFirst,
    /// Network first, dynamic partition on failure.
    NetworkFirst,
    /// Dynamic partition immediately, refreshed in the background.
    StaleWhileRevalidate,
}

impl RequestClass {
    /// Classify a URL by its path.
    pub fn of(url: &Url) -> Self {
        let path = url.path();

        if STATIC_ASSET.is_match(path) {
            RequestClass::StaticAsset
        } else if path.starts_with(API_PREFIX) {
            RequestClass::Api
        } else if path == "/" || PAGE_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
            RequestClass::Page
        } else {
            RequestClass::Other
        }
    }

    pub fn strategy(self) -> Strategy {
        match self {
            RequestClass::StaticAsset => Strategy::CacheFirst,
            RequestClass::Api | RequestClass::Other => Strategy::NetworkFirst,
            RequestClass::Page => Strategy::StaleWhileRevalidate,
        }
    }
}

/// Strategy for a URL.
pub fn select_strategy(url: &Url) -> Strategy {
    RequestClass::of(url).strategy()
}
