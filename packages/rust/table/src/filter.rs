//! Row and column filters applied before any lookup.
//!
//! Steps run in a fixed order: closed tickets, dropped columns, excluded
//! agents, excluded categories. A step whose column is absent is skipped.

use serde::Serialize;
use tracing::debug;
use trackfill_shared::{ColumnsConfig, FiltersConfig};

use crate::Table;

/// What each filter step removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterReport {
    pub rows_in: usize,
    pub closed_removed: usize,
    pub agents_removed: usize,
    pub categories_removed: usize,
    pub columns_dropped: Vec<String>,
    pub rows_out: usize,
}

/// Apply the configured filters in place.
pub fn apply_filters(
    table: &mut Table,
    filters: &FiltersConfig,
    columns: &ColumnsConfig,
) -> FilterReport {
    let mut report = FilterReport {
        rows_in: table.len(),
        ..FilterReport::default()
    };

    // 1. Closed tickets: status contains the marker as a substring.
    match table.column(&columns.status) {
        Some(col) if !filters.closed_marker.is_empty() => {
            let marker = filters.closed_marker.as_str();
            report.closed_removed =
                table.retain_rows(|row| !row.cell(col).is_some_and(|s| s.contains(marker)));
        }
        Some(_) => {}
        None => debug!(column = %columns.status, "status column missing, skipping closed filter"),
    }

    // 2. Dropped columns.
    for name in &filters.dropped_columns {
        if table.drop_column(name) {
            report.columns_dropped.push(name.clone());
        }
    }

    // 3. Excluded agents (exact match).
    if !filters.excluded_agents.is_empty() {
        match table.column(&columns.agent) {
            Some(col) => {
                report.agents_removed = table.retain_rows(|row| {
                    !row.cell(col)
                        .is_some_and(|agent| filters.excluded_agents.iter().any(|a| a == agent))
                });
            }
            None => debug!(column = %columns.agent, "agent column missing, skipping agent filter"),
        }
    }

    // 4. Excluded categories (exact match).
    if !filters.excluded_categories.is_empty() {
        match table.column(&columns.category) {
            Some(col) => {
                report.categories_removed = table.retain_rows(|row| {
                    !row.cell(col).is_some_and(|category| {
                        filters.excluded_categories.iter().any(|c| c == category)
                    })
                });
            }
            None => {
                debug!(column = %columns.category, "category column missing, skipping category filter");
            }
        }
    }

    report.rows_out = table.len();
    debug!(
        rows_in = report.rows_in,
        rows_out = report.rows_out,
        closed = report.closed_removed,
        agents = report.agents_removed,
        categories = report.categories_removed,
        "filters applied"
    );
    report
}
