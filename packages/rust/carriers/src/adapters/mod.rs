//! Carrier adapter trait and the built-in response parsers.
//!
//! An adapter knows two things about a carrier: how to build the tracking URL
//! for a shipment identifier, and how to turn the response body into an
//! [`Outcome`]. Parsing is pure so it can be tested against captured bodies
//! without a network.

mod markup;
mod scan_log;

use std::sync::Arc;

use trackfill_shared::{CarrierConfig, CarrierKind, Outcome, Result};
use url::Url;

use crate::endpoint::EndpointTemplate;

pub use markup::{DEFAULT_ROW_MARKER, MarkupAdapter, parse_highlighted_row};
pub use scan_log::{ScanLogAdapter, parse_scan_log};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Trait for carrier-specific request building and response parsing.
pub trait CarrierAdapter: Send + Sync {
    /// Carrier family this adapter serves, used in logs and reports.
    fn family(&self) -> &str;

    /// Build the tracking URL for one shipment identifier.
    fn request_url(&self, tracking_id: &str) -> Result<Url>;

    /// Extract the latest status from a response body.
    /// Any shape mismatch yields [`Outcome::NotFound`].
    fn parse(&self, body: &str) -> Outcome;
}

/// Build the adapter for one `[[carriers]]` entry.
///
/// `env` resolves the credential variables named in `query_env`.
pub fn build_adapter(
    config: &CarrierConfig,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<Arc<dyn CarrierAdapter>> {
    let endpoint = EndpointTemplate::resolve(config, env)?;

    let adapter: Arc<dyn CarrierAdapter> = match config.kind {
        CarrierKind::Markup => Arc::new(MarkupAdapter::new(
            &config.family,
            endpoint,
            config.row_marker.as_deref().unwrap_or(DEFAULT_ROW_MARKER),
        )),
        CarrierKind::ScanLog => Arc::new(ScanLogAdapter::new(&config.family, endpoint)),
    };

    Ok(adapter)
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds one adapter per configured carrier family, in config order.
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn CarrierAdapter>>,
}

impl AdapterRegistry {
    /// Build adapters for every configured carrier, reading credentials from the process env.
    pub fn from_config(carriers: &[CarrierConfig]) -> Result<Self> {
        Self::from_config_with_env(carriers, &|name| std::env::var(name).ok())
    }

    /// Build adapters with an explicit env lookup (used by tests).
    pub fn from_config_with_env(
        carriers: &[CarrierConfig],
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let adapters = carriers
            .iter()
            .map(|carrier| build_adapter(carrier, env))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { adapters })
    }

    /// Look up the adapter for a family.
    pub fn get(&self, family: &str) -> Option<Arc<dyn CarrierAdapter>> {
        self.adapters
            .iter()
            .find(|adapter| adapter.family() == family)
            .cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn CarrierAdapter>> {
        self.adapters.iter()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
