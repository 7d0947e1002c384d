//! Courier tracking lookups: adapters, HTTP client, and the bounded executor.
//!
//! This crate provides:
//! - [`adapters`]: per-carrier URL building and response parsing
//! - [`CarrierClient`]: one adapter bound to an HTTP client; lookups never fail
//! - [`executor`]: bounded-concurrency batch runner with per-item timeouts
//! - [`FetchObserver`]: diagnostics port for progress and failures

pub mod adapters;
pub mod client;
pub mod endpoint;
pub mod executor;
pub mod observer;

pub use adapters::{
    AdapterRegistry, CarrierAdapter, MarkupAdapter, ScanLogAdapter, build_adapter,
    parse_highlighted_row, parse_scan_log,
};
pub use client::{CarrierClient, LookupError, build_http_client};
pub use endpoint::EndpointTemplate;
pub use executor::{BatchResult, BatchSummary, ExecutorConfig, FetchExecutor, run_bounded};
pub use observer::{FetchObserver, SilentObserver, TracingObserver};
