use trackfill_shared::{Result, TrackfillError};

use crate::{Table, non_empty};

fn csv_err(e: csv::Error) -> TrackfillError {
    TrackfillError::Table(format!("csv: {e}"))
}

/// Parse CSV bytes. The first record is the header row.
pub(crate) fn read_csv(bytes: &[u8]) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        if record.len() > headers.len() {
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            return Err(TrackfillError::Table(format!(
                "line {line} has {} fields but the header has {}",
                record.len(),
                headers.len()
            )));
        }
        rows.push(record.iter().map(non_empty).collect());
    }

    Ok(Table::new(headers, rows))
}

/// Serialise to CSV. Absent cells are written as empty fields.
pub(crate) fn write_csv(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());

    if !table.headers().is_empty() {
        writer.write_record(table.headers()).map_err(csv_err)?;
    }
    for row in table.rows() {
        writer
            .write_record(row.cells.iter().map(|cell| cell.as_deref().unwrap_or("")))
            .map_err(csv_err)?;
    }

    writer
        .into_inner()
        .map_err(|e| TrackfillError::Table(format!("csv: failed to flush: {e}")))
}
