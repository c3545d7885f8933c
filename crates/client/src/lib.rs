//! Client code for folio-sw.
//!
//! This crate provides the HTTP fetch pipeline and the offline cache router
//! that decides, per request, between the cache partitions and the network.

pub mod fetch;
pub mod router;

pub use fetch::{FetchClient, FetchConfig, FetchRequest, FetchResponse, Fetcher, Method};
pub use router::{
    ActivateReport, BatchItem, BatchOutcome, BatchReport, CacheRouter, ControlMessage, InstallReport, LifecycleStatus,
    MessageOutcome, RequestClass, ResponseSource, RoutedResponse, RouterConfig, Strategy, WorkerState,
    select_strategy,
};
