//! SQLite-backed partition store.
//!
//! Persists named cache partitions and the request/response entries inside
//! them, with async access via tokio-rusqlite:
//!
//! - Request-addressed keys (SHA-256 over method and normalized URL)
//! - Lazy partition creation on first write
//! - Whole-partition deletion for version cleanup
//! - Automatic schema migrations

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod partitions;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CacheEntry, StoredResponse};
pub use partitions::{PartitionInfo, PartitionNames};
