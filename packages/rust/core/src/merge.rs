//! Merge engine: folds per-family lookup results back onto the table.
//!
//! Precedence for each derived field, first match wins:
//! 1. a non-empty value already in the table,
//! 2. the `Found` outcome from the row's own carrier family,
//! 3. absent.
//!
//! A row is never filled from another family's results, even when the
//! identifier collides.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, trace};
use trackfill_shared::{ColumnsConfig, Outcome};
use trackfill_table::Table;

use crate::records::ShipmentRecord;

/// `family -> tracking id -> outcome`.
pub type FamilyResults = HashMap<String, HashMap<String, Outcome>>;

/// The two derived fields for one row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedFields {
    pub status_text: Option<String>,
    pub status_timestamp: Option<String>,
}

/// Resolve both derived fields for a row from its existing values and its
/// own family's outcome.
pub fn resolve(existing: &DerivedFields, own: Option<&Outcome>) -> DerivedFields {
    let fetched = match own {
        Some(Outcome::Found {
            status_text,
            status_timestamp,
        }) => DerivedFields {
            status_text: present(status_text),
            status_timestamp: present(status_timestamp),
        },
        Some(Outcome::NotFound) | None => DerivedFields::default(),
    };

    DerivedFields {
        status_text: existing.status_text.clone().or(fetched.status_text),
        status_timestamp: existing.status_timestamp.clone().or(fetched.status_timestamp),
    }
}

fn present(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Counters for one merge pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    /// Rows with at least one field filled by this pass.
    pub rows_enriched: usize,
    /// Fields left alone because they already had a value.
    pub fields_kept: usize,
    /// Rows whose courier maps to no known family.
    pub rows_unrecognized: usize,
    /// Rows without a tracking id.
    pub rows_without_id: usize,
}

/// Apply `results` to `table`. The derived columns are appended when missing.
pub fn merge(
    table: &mut Table,
    records: &[ShipmentRecord],
    results: &FamilyResults,
    columns: &ColumnsConfig,
) -> MergeStats {
    let text_col = table.ensure_column(&columns.status_text);
    let timestamp_col = table.ensure_column(&columns.status_timestamp);
    let mut stats = MergeStats::default();

    for record in records {
        let Some(tracking_id) = record.tracking_id.as_deref() else {
            trace!(source_row = record.source_index, "no tracking id, row left as is");
            stats.rows_without_id += 1;
            continue;
        };
        let Some(family) = record.family.as_deref() else {
            trace!(source_row = record.source_index, "unrecognised courier, row left as is");
            stats.rows_unrecognized += 1;
            continue;
        };

        let existing = DerivedFields {
            status_text: record.status_text.clone(),
            status_timestamp: record.status_timestamp.clone(),
        };
        let own = results.get(family).and_then(|outcomes| outcomes.get(tracking_id));
        let resolved = resolve(&existing, own);

        stats.fields_kept += usize::from(existing.status_text.is_some())
            + usize::from(existing.status_timestamp.is_some());

        let mut filled = false;
        if existing.status_text.is_none() && resolved.status_text.is_some() {
            table.set_cell(record.row, text_col, resolved.status_text);
            filled = true;
        }
        if existing.status_timestamp.is_none() && resolved.status_timestamp.is_some() {
            table.set_cell(record.row, timestamp_col, resolved.status_timestamp);
            filled = true;
        }
        if filled {
            stats.rows_enriched += 1;
        }
    }

    debug!(
        rows_enriched = stats.rows_enriched,
        fields_kept = stats.fields_kept,
        rows_unrecognized = stats.rows_unrecognized,
        rows_without_id = stats.rows_without_id,
        "merge complete"
    );
    stats
}

#[cfg(test)]
mod tests {
    use trackfill_shared::AppConfig;

    use super::*;
    use crate::records::{FamilyRouter, extract_records};

    fn found(text: &str, ts: &str) -> Outcome {
        Outcome::Found {
            status_text: text.into(),
            status_timestamp: ts.into(),
        }
    }

    fn fields(text: Option<&str>, ts: Option<&str>) -> DerivedFields {
        DerivedFields {
            status_text: text.map(str::to_string),
            status_timestamp: ts.map(str::to_string),
        }
    }

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| {
                    r.iter()
                        .map(|c| (!c.is_empty()).then(|| c.to_string()))
                        .collect()
                })
                .collect(),
        )
    }

    fn results(entries: &[(&str, &str, Outcome)]) -> FamilyResults {
        let mut map = FamilyResults::new();
        for (family, id, outcome) in entries {
            map.entry(family.to_string())
                .or_default()
                .insert(id.to_string(), outcome.clone());
        }
        map
    }

    fn run(t: &mut Table, res: &FamilyResults) -> MergeStats {
        let config = AppConfig::default();
        let router = FamilyRouter::from_carriers(&config.carriers);
        let records = extract_records(t, &config.columns, &router).unwrap();
        merge(t, &records, res, &config.columns)
    }

    #[test]
    fn resolve_prefers_existing_then_own_outcome() {
        let outcome = found("Delivered", "2024-01-01 10:00");

        assert_eq!(
            resolve(&fields(None, None), Some(&outcome)),
            fields(Some("Delivered"), Some("2024-01-01 10:00"))
        );
        assert_eq!(
            resolve(&fields(Some("In Transit"), None), Some(&outcome)),
            fields(Some("In Transit"), Some("2024-01-01 10:00"))
        );
        assert_eq!(
            resolve(&fields(None, None), Some(&Outcome::NotFound)),
            fields(None, None)
        );
        assert_eq!(resolve(&fields(None, Some("x")), None), fields(None, Some("x")));
    }

    #[test]
    fn empty_fetched_values_stay_absent() {
        let outcome = found("Delivered", "");
        assert_eq!(
            resolve(&fields(None, None), Some(&outcome)),
            fields(Some("Delivered"), None)
        );
    }

    #[test]
    fn derived_columns_are_appended() {
        let mut t = table(&["COURIER NAME", "TRACKING ID"], &[&["Bluedart", "B1"]]);
        let stats = run(
            &mut t,
            &results(&[("bluedart", "B1", found("Delivered", "01 Jan 2024 10:00"))]),
        );

        assert_eq!(t.headers().len(), 4);
        assert_eq!(t.cell(0, t.column("Details").unwrap()), Some("Delivered"));
        assert_eq!(
            t.cell(0, t.column("Details Date").unwrap()),
            Some("01 Jan 2024 10:00")
        );
        assert_eq!(stats.rows_enriched, 1);
    }

    #[test]
    fn duplicate_ids_all_receive_the_result() {
        let mut t = table(
            &["COURIER NAME", "TRACKING ID"],
            &[&["Bluedart", "B1"], &["BlueDart Surface", "B1"]],
        );
        run(&mut t, &results(&[("bluedart", "B1", found("Delivered", "d"))]));

        let col = t.column("Details").unwrap();
        assert_eq!(t.cell(0, col), Some("Delivered"));
        assert_eq!(t.cell(1, col), Some("Delivered"));
    }

    #[test]
    fn never_fills_from_another_family() {
        let mut t = table(
            &["COURIER NAME", "TRACKING ID"],
            &[&["Delhivery FR", "X1"], &["Bluedart", "X1"]],
        );
        run(
            &mut t,
            &results(&[
                ("bluedart", "X1", found("Delivered", "d")),
                ("delhivery", "X1", Outcome::NotFound),
            ]),
        );

        let col = t.column("Details").unwrap();
        assert_eq!(t.cell(0, col), None);
        assert_eq!(t.cell(1, col), Some("Delivered"));
    }

    #[test]
    fn unrecognized_couriers_are_left_empty() {
        let mut t = table(
            &["COURIER NAME", "TRACKING ID"],
            &[&["Ecom Express", "X1"], &["Bluedart", ""]],
        );
        let stats = run(&mut t, &results(&[("bluedart", "X1", found("Delivered", "d"))]));

        let col = t.column("Details").unwrap();
        assert_eq!(t.cell(0, col), None);
        assert_eq!(t.cell(1, col), None);
        assert_eq!(stats.rows_unrecognized, 1);
        assert_eq!(stats.rows_without_id, 1);
    }

    #[test]
    fn re_merge_is_idempotent() {
        let mut t = table(
            &["COURIER NAME", "TRACKING ID", "Details", "Details Date"],
            &[&["Bluedart", "B1", "", ""]],
        );
        run(&mut t, &results(&[("bluedart", "B1", found("In Transit", "t1"))]));
        let after_first = t.clone();

        let stats = run(&mut t, &results(&[("bluedart", "B1", found("Delivered", "t2"))]));
        assert_eq!(t, after_first);
        assert_eq!(stats.rows_enriched, 0);
        assert_eq!(stats.fields_kept, 2);
    }
}
