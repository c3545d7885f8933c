//! folio-sw server entry point.
//!
//! Boots the offline cache router behind an MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

use folio_client::{CacheRouter, FetchClient, FetchConfig, RouterConfig};
use folio_core::{AppConfig, BuildManifest, CacheDb};

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    let manifest = BuildManifest::resolve(&config).context("loading build manifest")?;

    tracing::info!(
        version = manifest.version(),
        origin = %config.origin,
        db = %config.db_path.display(),
        "Starting folio-sw server on stdio transport"
    );

    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache at {}", config.db_path.display()))?;
    let fetcher = FetchClient::new(FetchConfig::from_app(&config))?;
    let router = CacheRouter::new(db, Arc::new(fetcher), RouterConfig::from_app(&config, manifest)?);

    let handler = handler::FolioSwServer::new(Arc::new(router));
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
