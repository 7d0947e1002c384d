//! Tracking endpoint URL templates.

use trackfill_shared::{CarrierConfig, Result, TrackfillError};
use url::Url;
use url::form_urlencoded::byte_serialize;

/// Placeholder replaced by the encoded shipment identifier.
const ID_PLACEHOLDER: &str = "{id}";

/// Identifier used to check that a template produces a valid URL.
const SAMPLE_ID: &str = "0000000000";

/// Endpoint URL template plus resolved credential query parameters.
#[derive(Debug, Clone)]
pub struct EndpointTemplate {
    template: String,
    query: Vec<(String, String)>,
}

impl EndpointTemplate {
    /// Build a template from a raw string and already-resolved query pairs.
    pub fn new(template: impl Into<String>, query: Vec<(String, String)>) -> Result<Self> {
        let endpoint = Self {
            template: template.into(),
            query,
        };
        endpoint.url_for(SAMPLE_ID)?;
        Ok(endpoint)
    }

    /// Resolve a carrier's template, reading each `query_env` variable through `env`.
    ///
    /// A missing credential fails here, before any lookup runs.
    pub fn resolve(config: &CarrierConfig, env: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let mut query = Vec::with_capacity(config.query_env.len());
        let mut missing = Vec::new();
        for (param, var) in &config.query_env {
            match env(var) {
                Some(value) if !value.is_empty() => query.push((param.clone(), value)),
                _ => missing.push(var.as_str()),
            }
        }

        if !missing.is_empty() {
            return Err(TrackfillError::config(format!(
                "carrier '{}' needs environment variable(s): {}",
                config.family,
                missing.join(", ")
            )));
        }

        Self::new(config.endpoint.clone(), query)
    }

    /// Concrete URL for one shipment identifier.
    pub fn url_for(&self, tracking_id: &str) -> Result<Url> {
        let query_encoded: String = byte_serialize(tracking_id.as_bytes()).collect();
        // In a path `+` is a literal plus, so spaces become `%20` there.
        let path_encoded = query_encoded.replace('+', "%20");

        let raw = match self.template.split_once('?') {
            Some((path, query)) => format!(
                "{}?{}",
                path.replace(ID_PLACEHOLDER, &path_encoded),
                query.replace(ID_PLACEHOLDER, &query_encoded)
            ),
            None => self.template.replace(ID_PLACEHOLDER, &path_encoded),
        };

        let mut url = Url::parse(&raw)
            .map_err(|e| TrackfillError::Network(format!("invalid endpoint '{raw}': {e}")))?;

        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }

        Ok(url)
    }
}
