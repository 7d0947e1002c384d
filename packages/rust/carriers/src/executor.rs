//! Bounded-concurrency fetch executor.
//!
//! Runs one lookup per unique shipment identifier with a fixed ceiling on
//! in-flight requests. Every identifier gets exactly one entry in the result
//! map: failures, per-item timeouts and deadline aborts are recorded as
//! [`Outcome::NotFound`] and reported to the [`FetchObserver`].

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{instrument, warn};
use trackfill_shared::{FetchConfig, Outcome, Result, TrackfillError};

use crate::adapters::CarrierAdapter;
use crate::client::{CarrierClient, LookupError, build_http_client};
use crate::observer::FetchObserver;

type LookupResult = std::result::Result<Outcome, LookupError>;

// ---------------------------------------------------------------------------
// Config and results
// ---------------------------------------------------------------------------

/// Runtime executor limits, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum simultaneous in-flight lookups.
    pub concurrency: usize,
    /// Per-lookup timeout, measured from when the lookup gets its slot.
    pub request_timeout: Duration,
    /// Optional deadline for the whole batch.
    pub batch_deadline: Option<Duration>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for ExecutorConfig {
    fn from(config: &FetchConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            request_timeout: config.request_timeout(),
            batch_deadline: config.batch_deadline(),
        }
    }
}

/// Counts for one completed batch.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub family: String,
    /// Unique identifiers submitted.
    pub submitted: usize,
    /// Lookups that returned a status.
    pub found: usize,
    /// Lookups that completed but reported nothing recognisable.
    pub not_found: usize,
    /// Lookups that failed, timed out or were aborted.
    pub failed: usize,
    pub elapsed: Duration,
}

/// Complete outcome map for one batch.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// One entry per unique submitted identifier.
    pub outcomes: HashMap<String, Outcome>,
    pub summary: BatchSummary,
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Owns the HTTP client and the concurrency limits for carrier batches.
pub struct FetchExecutor {
    config: ExecutorConfig,
    http: Client,
}

impl FetchExecutor {
    pub fn new(config: ExecutorConfig) -> Result<Self> {
        if config.concurrency == 0 {
            return Err(TrackfillError::config("concurrency must be at least 1"));
        }
        let http = build_http_client(config.request_timeout)?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Bind an adapter to this executor's HTTP client for one-off lookups.
    pub fn client_for(&self, adapter: Arc<dyn CarrierAdapter>) -> CarrierClient {
        CarrierClient::new(self.http.clone(), adapter)
    }

    /// Look up every identifier with `adapter`, at most `concurrency` at a time.
    #[instrument(skip_all, fields(family = adapter.family(), items = tracking_ids.len()))]
    pub async fn run_batch(
        &self,
        adapter: Arc<dyn CarrierAdapter>,
        tracking_ids: &[String],
        observer: &dyn FetchObserver,
    ) -> BatchResult {
        let client = self.client_for(adapter);
        let family = client.family().to_string();

        run_bounded(&family, tracking_ids, &self.config, observer, move |id: String| {
            let client = client.clone();
            async move { client.try_fetch(&id).await }
        })
        .await
    }
}

/// Run `lookup` once per unique identifier under the limits in `config`.
///
/// Waits for every lookup to finish, time out, or be cut off by the batch
/// deadline before returning.
pub async fn run_bounded<F, Fut>(
    family: &str,
    tracking_ids: &[String],
    config: &ExecutorConfig,
    observer: &dyn FetchObserver,
    lookup: F,
) -> BatchResult
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = LookupResult> + Send + 'static,
{
    let start = Instant::now();

    let mut seen = HashSet::new();
    let unique: Vec<&str> = tracking_ids
        .iter()
        .map(String::as_str)
        .filter(|id| seen.insert(*id))
        .collect();

    observer.batch_started(family, unique.len());

    let lookup = Arc::new(lookup);
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let mut join_set: JoinSet<(String, LookupResult)> = JoinSet::new();

    for id in &unique {
        let id = (*id).to_string();
        let lookup = Arc::clone(&lookup);
        let semaphore = Arc::clone(&semaphore);
        let timeout = config.request_timeout;

        join_set.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return (id, Err(LookupError::Aborted));
            };

            let result = match tokio::time::timeout(timeout, lookup(id.clone())).await {
                Ok(result) => result,
                Err(_) => Err(LookupError::Timeout),
            };
            (id, result)
        });
    }

    let mut summary = BatchSummary {
        family: family.to_string(),
        submitted: unique.len(),
        ..Default::default()
    };
    let mut outcomes = HashMap::with_capacity(unique.len());

    let drain = collect(&mut join_set, family, observer, &mut outcomes, &mut summary);
    let completed = match config.batch_deadline {
        Some(deadline) => tokio::time::timeout(deadline, drain).await.is_ok(),
        None => {
            drain.await;
            true
        }
    };

    if !completed {
        warn!(
            family,
            pending = join_set.len(),
            "batch deadline reached, aborting remaining lookups"
        );
        join_set.abort_all();
    }

    // Deadline aborts and failed tasks leave gaps; every identifier still gets an entry.
    for id in &unique {
        if !outcomes.contains_key(*id) {
            observer.lookup_failed(family, id, &LookupError::Aborted);
            observer.item_finished(family, id, &Outcome::NotFound);
            summary.failed += 1;
            outcomes.insert((*id).to_string(), Outcome::NotFound);
        }
    }

    summary.elapsed = start.elapsed();
    observer.batch_finished(&summary);

    BatchResult { outcomes, summary }
}

/// Drain finished lookups into `outcomes` until the set is empty.
async fn collect(
    join_set: &mut JoinSet<(String, LookupResult)>,
    family: &str,
    observer: &dyn FetchObserver,
    outcomes: &mut HashMap<String, Outcome>,
    summary: &mut BatchSummary,
) {
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((id, Ok(outcome))) => {
                if outcome.is_found() {
                    summary.found += 1;
                } else {
                    summary.not_found += 1;
                }
                observer.item_finished(family, &id, &outcome);
                outcomes.insert(id, outcome);
            }
            Ok((id, Err(e))) => {
                observer.lookup_failed(family, &id, &e);
                observer.item_finished(family, &id, &Outcome::NotFound);
                summary.failed += 1;
                outcomes.insert(id, Outcome::NotFound);
            }
            Err(e) => {
                warn!(family, error = %e, "lookup task failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use trackfill_shared::{CarrierConfig, CarrierKind};

    use super::*;
    use crate::adapters::build_adapter;
    use crate::observer::SilentObserver;

    /// Observer that records failures by error class.
    #[derive(Default)]
    struct RecordingObserver {
        failures: Mutex<Vec<(String, &'static str)>>,
        finished: AtomicUsize,
    }

    impl FetchObserver for RecordingObserver {
        fn batch_started(&self, _family: &str, _total: usize) {}
        fn item_finished(&self, _family: &str, _tracking_id: &str, _outcome: &Outcome) {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
        fn lookup_failed(&self, _family: &str, tracking_id: &str, error: &LookupError) {
            self.failures
                .lock()
                .unwrap()
                .push((tracking_id.to_string(), error.class()));
        }
        fn batch_finished(&self, _summary: &BatchSummary) {}
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn config(concurrency: usize, timeout_ms: u64, deadline_ms: Option<u64>) -> ExecutorConfig {
        ExecutorConfig {
            concurrency,
            request_timeout: Duration::from_millis(timeout_ms),
            batch_deadline: deadline_ms.map(Duration::from_millis),
        }
    }

    fn found(text: &str) -> Outcome {
        Outcome::from_parts(text, "2024-01-01 10:00")
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn in_flight_never_exceeds_ceiling() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let tracking_ids: Vec<String> = (0..40).map(|i| format!("AWB{i}")).collect();

        let (in_flight_seen, peak_seen) = (Arc::clone(&in_flight), Arc::clone(&peak));
        let result = run_bounded(
            "bluedart",
            &tracking_ids,
            &config(4, 5_000, None),
            &SilentObserver,
            move |id| {
                let in_flight = Arc::clone(&in_flight_seen);
                let peak = Arc::clone(&peak_seen);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(found(&format!("status for {id}")))
                }
            },
        )
        .await;

        assert_eq!(result.outcomes.len(), 40);
        assert_eq!(result.summary.found, 40);
        let peak = peak.load(Ordering::SeqCst);
        assert!(peak <= 4, "peak in-flight was {peak}");
        assert!(peak >= 1);
    }

    #[tokio::test]
    async fn duplicate_identifiers_are_fetched_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let result = run_bounded(
            "delhivery",
            &ids(&["AWB1", "AWB2", "AWB1", "AWB1"]),
            &config(10, 1_000, None),
            &SilentObserver,
            move |id| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { Ok(found(&id)) }
            },
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(result.outcomes.len(), 2);
        assert_eq!(result.summary.submitted, 2);
        assert_eq!(result.outcomes["AWB1"], found("AWB1"));
    }

    #[tokio::test]
    async fn slow_lookup_times_out_without_failing_batch() {
        let observer = RecordingObserver::default();

        let result = run_bounded(
            "bluedart",
            &ids(&["FAST", "SLOW"]),
            &config(2, 50, None),
            &observer,
            |id| async move {
                if id == "SLOW" {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                Ok(found("Delivered"))
            },
        )
        .await;

        assert_eq!(result.outcomes["FAST"], found("Delivered"));
        assert_eq!(result.outcomes["SLOW"], Outcome::NotFound);
        assert_eq!(result.summary.failed, 1);
        assert_eq!(
            *observer.failures.lock().unwrap(),
            vec![("SLOW".to_string(), "timeout")]
        );
        assert_eq!(observer.finished.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_are_isolated_per_item() {
        let observer = RecordingObserver::default();

        let result = run_bounded(
            "delhivery",
            &ids(&["OK1", "BROKEN", "OK2"]),
            &config(3, 1_000, None),
            &observer,
            |id| async move {
                if id == "BROKEN" {
                    Err(LookupError::Transport("connection refused".into()))
                } else {
                    Ok(found("In Transit"))
                }
            },
        )
        .await;

        assert_eq!(result.outcomes.len(), 3);
        assert_eq!(result.outcomes["BROKEN"], Outcome::NotFound);
        assert!(result.outcomes["OK1"].is_found());
        assert!(result.outcomes["OK2"].is_found());
        assert_eq!(result.summary.found, 2);
        assert_eq!(result.summary.failed, 1);
        assert_eq!(
            *observer.failures.lock().unwrap(),
            vec![("BROKEN".to_string(), "transport")]
        );
    }

    #[tokio::test]
    async fn batch_deadline_aborts_stragglers() {
        let observer = RecordingObserver::default();
        let started = Instant::now();

        let result = run_bounded(
            "bluedart",
            &ids(&["FAST", "SLOW1", "SLOW2"]),
            &config(3, 10_000, Some(100)),
            &observer,
            |id| async move {
                if id != "FAST" {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                Ok(found("Delivered"))
            },
        )
        .await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(result.outcomes.len(), 3);
        assert!(result.outcomes["FAST"].is_found());
        assert_eq!(result.outcomes["SLOW1"], Outcome::NotFound);
        assert_eq!(result.outcomes["SLOW2"], Outcome::NotFound);

        let mut failures = observer.failures.lock().unwrap().clone();
        failures.sort();
        assert_eq!(
            failures,
            vec![
                ("SLOW1".to_string(), "aborted"),
                ("SLOW2".to_string(), "aborted")
            ]
        );
    }

    #[tokio::test]
    async fn empty_batch_returns_empty_map() {
        let result = run_bounded(
            "bluedart",
            &[],
            &config(10, 1_000, None),
            &SilentObserver,
            |id| async move { Ok(found(&id)) },
        )
        .await;

        assert!(result.outcomes.is_empty());
        assert_eq!(result.summary.submitted, 0);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let result = FetchExecutor::new(config(0, 1_000, None));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn run_batch_against_mock_carrier() {
        let server = wiremock::MockServer::start().await;
        let delivered = r#"<html><body><table>
            <tr bgcolor="WHITE"><td>MUMBAI</td><td>Delivered</td><td>2024-01-01</td><td>10:00</td></tr>
        </table></body></html>"#;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/track"))
            .and(wiremock::matchers::query_param("numbers", "AWB1"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(delivered))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/track"))
            .and(wiremock::matchers::query_param("numbers", "AWB2"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string(delivered)
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/track"))
            .and(wiremock::matchers::query_param("numbers", "AWB3"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let carrier = CarrierConfig {
            family: "bluedart".into(),
            kind: CarrierKind::Markup,
            endpoint: format!("{}/track?numbers={{id}}", server.uri()),
            courier_names: vec!["Bluedart".into()],
            row_marker: None,
            query_env: Default::default(),
        };
        let adapter = build_adapter(&carrier, &|_| None).unwrap();
        let executor = FetchExecutor::new(config(2, 200, None)).unwrap();
        let observer = RecordingObserver::default();

        let result = executor
            .run_batch(adapter, &ids(&["AWB1", "AWB2", "AWB3"]), &observer)
            .await;

        assert_eq!(result.outcomes.len(), 3);
        assert_eq!(
            result.outcomes["AWB1"],
            Outcome::Found {
                status_text: "Delivered".into(),
                status_timestamp: "2024-01-01 10:00".into(),
            }
        );
        assert_eq!(result.outcomes["AWB2"], Outcome::NotFound);
        assert_eq!(result.outcomes["AWB3"], Outcome::NotFound);

        let mut failures = observer.failures.lock().unwrap().clone();
        failures.sort();
        assert_eq!(
            failures,
            vec![
                ("AWB2".to_string(), "timeout"),
                ("AWB3".to_string(), "http_status")
            ]
        );
    }
}
