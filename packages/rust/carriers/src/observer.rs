//! Diagnostics port for the fetch layer.
//!
//! The executor reports progress and per-item failures here instead of
//! logging inline, so callers choose where diagnostics go (tracing, a
//! progress bar, a test recorder).

use tracing::{debug, info, warn};
use trackfill_shared::Outcome;

use crate::client::LookupError;
use crate::executor::BatchSummary;

/// Receives fetch-phase events. Implementations must be cheap; they are
/// called from the collecting loop.
pub trait FetchObserver: Send + Sync {
    /// A batch of `total` unique identifiers is about to run.
    fn batch_started(&self, family: &str, total: usize);
    /// One identifier finished (successfully or not).
    fn item_finished(&self, family: &str, tracking_id: &str, outcome: &Outcome);
    /// A lookup failed and was recorded as `NotFound`.
    fn lookup_failed(&self, family: &str, tracking_id: &str, error: &LookupError);
    /// The batch returned.
    fn batch_finished(&self, summary: &BatchSummary);
}

/// No-op observer for headless/test usage.
pub struct SilentObserver;

impl FetchObserver for SilentObserver {
    fn batch_started(&self, _family: &str, _total: usize) {}
    fn item_finished(&self, _family: &str, _tracking_id: &str, _outcome: &Outcome) {}
    fn lookup_failed(&self, _family: &str, _tracking_id: &str, _error: &LookupError) {}
    fn batch_finished(&self, _summary: &BatchSummary) {}
}

/// Observer that emits structured `tracing` events.
pub struct TracingObserver;

impl FetchObserver for TracingObserver {
    fn batch_started(&self, family: &str, total: usize) {
        info!(family, total, "fetching tracking details");
    }

    fn item_finished(&self, family: &str, tracking_id: &str, outcome: &Outcome) {
        debug!(family, tracking_id, found = outcome.is_found(), "lookup finished");
    }

    fn lookup_failed(&self, family: &str, tracking_id: &str, error: &LookupError) {
        warn!(
            family,
            tracking_id,
            error_class = error.class(),
            error = %error,
            "lookup failed"
        );
    }

    fn batch_finished(&self, summary: &BatchSummary) {
        info!(
            family = %summary.family,
            submitted = summary.submitted,
            found = summary.found,
            not_found = summary.not_found,
            failed = summary.failed,
            duration_ms = summary.elapsed.as_millis(),
            "batch completed"
        );
    }
}
