//! End-to-end job: read → filter → partition → fetch → merge → write.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use trackfill_carriers::{AdapterRegistry, FetchExecutor, FetchObserver};
use trackfill_shared::{AppConfig, JobId, Result};
use trackfill_table::{FilterReport, Table, TableFormat, apply_filters, read_table, write_table_to};

use crate::merge::{FamilyResults, MergeStats, merge};
use crate::partition::partition;
use crate::records::{FamilyRouter, extract_records};

/// Per-family fetch counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FamilyReport {
    pub family: String,
    pub unique_ids: usize,
    pub found: usize,
    pub not_found: usize,
    /// Lookups that failed (transport, status, timeout, deadline).
    pub failed: usize,
}

/// Summary of one processing run.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job_id: JobId,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    pub rows_in: usize,
    pub rows_out: usize,
    pub filters: FilterReport,
    /// `false` when the courier or tracking column was missing.
    pub enrichment_ran: bool,
    pub families: Vec<FamilyReport>,
    pub merge: MergeStats,
    pub elapsed_ms: u128,
}

/// Filter and enrich a table in memory.
#[instrument(skip_all, fields(rows = table.len()))]
pub async fn process_table(
    mut table: Table,
    config: &AppConfig,
    registry: &AdapterRegistry,
    executor: &FetchExecutor,
    observer: &dyn FetchObserver,
) -> Result<(Table, JobReport)> {
    let start = Instant::now();
    let job_id = JobId::new();
    let started_at = Utc::now();
    let rows_in = table.len();

    info!(%job_id, rows = rows_in, "starting job");

    // --- Phase 1: Filter ---
    let filters = apply_filters(&mut table, &config.filters, &config.columns);

    // --- Phase 2: Records + partition ---
    let router = FamilyRouter::from_carriers(&config.carriers);
    let records = extract_records(&table, &config.columns, &router);
    let enrichment_ran = records.is_some();
    let records = records.unwrap_or_default();
    let work = partition(&records, router.families());

    // --- Phase 3: Fetch, one batch per family ---
    let mut results = FamilyResults::new();
    let mut families = Vec::with_capacity(work.len());

    for list in work {
        let Some(adapter) = registry.get(&list.family) else {
            warn!(family = %list.family, "no adapter registered, skipping family");
            continue;
        };

        let batch = executor.run_batch(adapter, &list.tracking_ids, observer).await;
        families.push(FamilyReport {
            family: list.family.clone(),
            unique_ids: batch.summary.submitted,
            found: batch.summary.found,
            not_found: batch.summary.not_found,
            failed: batch.summary.failed,
        });
        results.insert(list.family, batch.outcomes);
    }

    // --- Phase 4: Merge ---
    let merge = merge(&mut table, &records, &results, &config.columns);

    let report = JobReport {
        job_id,
        started_at,
        input: None,
        output: None,
        rows_in,
        rows_out: table.len(),
        filters,
        enrichment_ran,
        families,
        merge,
        elapsed_ms: start.elapsed().as_millis(),
    };

    info!(
        job_id = %report.job_id,
        rows_in = report.rows_in,
        rows_out = report.rows_out,
        rows_enriched = report.merge.rows_enriched,
        elapsed_ms = report.elapsed_ms,
        "job complete"
    );

    Ok((table, report))
}

/// Read `input`, process it, and write the result to `output`.
///
/// The output encoding follows the extension of `output`. Nothing is written
/// unless every step before the write succeeded.
#[instrument(skip_all, fields(input = %input.display()))]
pub async fn process_file(
    input: &Path,
    output: &Path,
    config: &AppConfig,
    registry: &AdapterRegistry,
    executor: &FetchExecutor,
    observer: &dyn FetchObserver,
) -> Result<JobReport> {
    let output_format = TableFormat::from_path(output)?;
    let table = read_table(input)?;

    let (table, mut report) = process_table(table, config, registry, executor, observer).await?;

    write_table_to(output, &table, output_format)?;
    info!(output = %output.display(), rows = table.len(), "output written");

    report.input = Some(input.to_path_buf());
    report.output = Some(output.to_path_buf());
    Ok(report)
}
