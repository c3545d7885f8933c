//! Build manifest: the asset list and version token produced by the site build.
//!
//! The manifest is JSON of the form
//!
//! ```json
//! { "version": "1718000000", "files": ["/favicon.png"], "routes": ["/offline.html"] }
//! ```
//!
//! Every field is optional. Routes from the manifest are appended to the
//! configured pre-cache routes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{AppConfig, Error};

/// Inputs the lifecycle manager pre-caches at install time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildManifest {
    /// Version token naming this build's partitions.
    #[serde(default)]
    pub version: Option<String>,

    /// Build output files (scripts, stylesheets, images, fonts).
    #[serde(default)]
    pub files: Vec<String>,

    /// Extra top-level routes to pre-cache.
    #[serde(default)]
    pub routes: Vec<String>,
}

impl BuildManifest {
    /// Parse a manifest from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Manifest(e.to_string()))
    }

    /// Read a manifest file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let json =
            std::fs::read_to_string(path).map_err(|e| Error::Manifest(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// Build the effective manifest for a configuration.
    ///
    /// Reads `manifest_path` when set, falls back to the configured version
    /// token, and merges the configured pre-cache routes in front of the
    /// manifest's own routes.
    pub fn resolve(config: &AppConfig) -> Result<Self, Error> {
        let mut manifest = match &config.manifest_path {
            Some(path) => Self::from_path(path)?,
            None => Self::default(),
        };

        if manifest.version.as_deref().is_none_or(str::is_empty) {
            manifest.version = Some(config.version.clone());
        }
        let version = manifest.version();
        if version.chars().any(char::is_whitespace) {
            return Err(Error::Manifest(format!("version must not contain whitespace: {version:?}")));
        }

        let mut routes = config.precache_routes.clone();
        routes.append(&mut manifest.routes);
        manifest.routes = routes;

        Ok(manifest)
    }

    /// Version token, `dev` when none was resolved.
    pub fn version(&self) -> &str {
        self.version.as_deref().unwrap_or("dev")
    }

    /// Everything to pre-cache: files then routes, first occurrence wins.
    pub fn precache_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = Vec::with_capacity(self.files.len() + self.routes.len());
        for path in self.files.iter().chain(&self.routes) {
            if !paths.contains(path) {
                paths.push(path.clone());
            }
        }
        paths
    }
}
