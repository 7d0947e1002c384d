//! Shipment records: the per-row view the partitioner and merge engine work on.

use std::collections::HashMap;

use tracing::debug;
use trackfill_shared::{CarrierConfig, ColumnsConfig};
use trackfill_table::Table;

/// Routes free-text courier names to their carrier family.
#[derive(Debug, Clone, Default)]
pub struct FamilyRouter {
    by_courier: HashMap<String, String>,
    order: Vec<String>,
}

impl FamilyRouter {
    pub fn from_carriers(carriers: &[CarrierConfig]) -> Self {
        let mut by_courier = HashMap::new();
        let mut order = Vec::with_capacity(carriers.len());
        for carrier in carriers {
            order.push(carrier.family.clone());
            for name in &carrier.courier_names {
                by_courier.insert(name.clone(), carrier.family.clone());
            }
        }
        Self { by_courier, order }
    }

    /// Family for an exact courier-name value.
    pub fn family_for(&self, courier: &str) -> Option<&str> {
        self.by_courier.get(courier).map(String::as_str)
    }

    /// Families in configuration order.
    pub fn families(&self) -> &[String] {
        &self.order
    }
}

/// One row of the working dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipmentRecord {
    /// Position of the row in the filtered table.
    pub row: usize,
    /// Position of the row in the source file.
    pub source_index: usize,
    /// Recognised carrier family, if the courier name maps to one.
    pub family: Option<String>,
    /// Trimmed tracking code; never empty.
    pub tracking_id: Option<String>,
    pub status_text: Option<String>,
    pub status_timestamp: Option<String>,
}

/// Column positions needed to build records.
#[derive(Debug, Clone, Copy)]
struct RecordColumns {
    courier: usize,
    tracking_id: usize,
    status_text: Option<usize>,
    status_timestamp: Option<usize>,
}

/// Build one record per row.
///
/// Returns `None` when the courier or tracking-id column is missing; the
/// enrichment step is then skipped for the whole table.
pub fn extract_records(
    table: &Table,
    columns: &ColumnsConfig,
    router: &FamilyRouter,
) -> Option<Vec<ShipmentRecord>> {
    let Some(cols) = record_columns(table, columns) else {
        debug!(
            courier = %columns.courier,
            tracking_id = %columns.tracking_id,
            "courier or tracking column missing, skipping enrichment"
        );
        return None;
    };

    let records = table
        .rows()
        .iter()
        .enumerate()
        .map(|(position, row)| {
            let family = row
                .cell(cols.courier)
                .and_then(|c| router.family_for(c))
                .map(str::to_string);
            let tracking_id = row
                .cell(cols.tracking_id)
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string);

            ShipmentRecord {
                row: position,
                source_index: row.index,
                family,
                tracking_id,
                status_text: cols.status_text.and_then(|c| row.cell(c)).map(str::to_string),
                status_timestamp: cols
                    .status_timestamp
                    .and_then(|c| row.cell(c))
                    .map(str::to_string),
            }
        })
        .collect();

    Some(records)
}

fn record_columns(table: &Table, columns: &ColumnsConfig) -> Option<RecordColumns> {
    Some(RecordColumns {
        courier: table.column(&columns.courier)?,
        tracking_id: table.column(&columns.tracking_id)?,
        status_text: table.column(&columns.status_text),
        status_timestamp: table.column(&columns.status_timestamp),
    })
}
