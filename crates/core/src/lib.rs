//! Core types and shared functionality for folio-sw.
//!
//! This crate provides:
//! - Partition store with SQLite backend
//! - Build manifest loading
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod manifest;

pub use cache::{CacheDb, CacheEntry, PartitionInfo, PartitionNames, StoredResponse};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use manifest::BuildManifest;
