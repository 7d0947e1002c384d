//! HTTP round trip for a single tracking lookup.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;
use trackfill_shared::{Outcome, Result, TrackfillError};

use crate::adapters::CarrierAdapter;
use crate::observer::FetchObserver;

/// User-Agent string for tracking requests.
const USER_AGENT: &str = concat!("trackfill/", env!("CARGO_PKG_VERSION"));

/// Why a lookup produced no data. Never escapes the fetch layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// Tracking URL could not be built for this identifier.
    #[error("request error: {0}")]
    Request(String),

    /// Connection, DNS or TLS failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Endpoint answered with a non-2xx status.
    #[error("HTTP {0}")]
    Status(u16),

    /// Response body could not be read.
    #[error("body read failed: {0}")]
    Body(String),

    /// Lookup exceeded its per-item timeout.
    #[error("timed out")]
    Timeout,

    /// Lookup was cancelled before finishing (batch deadline or task failure).
    #[error("aborted")]
    Aborted,
}

impl LookupError {
    /// Stable error class for logs and reports.
    pub fn class(&self) -> &'static str {
        match self {
            Self::Request(_) => "request",
            Self::Transport(_) => "transport",
            Self::Status(_) => "http_status",
            Self::Body(_) => "body",
            Self::Timeout => "timeout",
            Self::Aborted => "aborted",
        }
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Build the shared HTTP client used for every lookup.
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(timeout)
        .build()
        .map_err(|e| TrackfillError::Network(format!("failed to build HTTP client: {e}")))
}

/// One carrier adapter bound to an HTTP client.
#[derive(Clone)]
pub struct CarrierClient {
    http: Client,
    adapter: Arc<dyn CarrierAdapter>,
}

impl CarrierClient {
    pub fn new(http: Client, adapter: Arc<dyn CarrierAdapter>) -> Self {
        Self { http, adapter }
    }

    pub fn family(&self) -> &str {
        self.adapter.family()
    }

    /// Fetch and parse one identifier, reporting why nothing came back.
    pub async fn try_fetch(&self, tracking_id: &str) -> std::result::Result<Outcome, LookupError> {
        let url = self
            .adapter
            .request_url(tracking_id)
            .map_err(|e| LookupError::Request(e.to_string()))?;

        debug!(family = self.family(), tracking_id, %url, "fetching tracking page");

        let response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                LookupError::Timeout
            } else {
                LookupError::Body(e.to_string())
            }
        })?;

        Ok(self.adapter.parse(&body))
    }

    /// Fetch one identifier. Never fails: errors are reported to `observer`
    /// and collapse to [`Outcome::NotFound`].
    pub async fn fetch(&self, tracking_id: &str, observer: &dyn FetchObserver) -> Outcome {
        match self.try_fetch(tracking_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                observer.lookup_failed(self.family(), tracking_id, &e);
                Outcome::NotFound
            }
        }
    }
}
