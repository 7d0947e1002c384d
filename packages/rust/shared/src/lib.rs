//! Shared types, error model, and configuration for trackfill.
//!
//! This crate is the foundation depended on by all other trackfill crates.
//! It provides:
//! - [`TrackfillError`]: the unified error type
//! - Domain types ([`Outcome`], [`JobId`])
//! - Configuration ([`AppConfig`], [`FetchConfig`], [`CarrierConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CarrierConfig, CarrierKind, ColumnsConfig, FetchConfig, FiltersConfig, InputConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{Result, TrackfillError};
pub use types::{JobId, Outcome};
