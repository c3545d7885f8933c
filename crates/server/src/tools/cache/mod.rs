//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting the partition store.

pub mod get;
pub mod list;

pub use get::{CacheGetParams, get_impl};
pub use list::{CacheListParams, list_impl};
