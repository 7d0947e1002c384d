//! Format dispatch by file extension.

use std::path::Path;

use tracing::{debug, info};
use trackfill_shared::{Result, TrackfillError};

use crate::{Table, csv_codec, xlsx_codec};

/// Supported tabular file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Xlsx,
}

impl TableFormat {
    /// Pick the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        match extension.as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" => Ok(Self::Xlsx),
            _ => Err(TrackfillError::UnsupportedFormat { extension }),
        }
    }
}

/// Read a table from disk, choosing the codec by extension.
pub fn read_table(path: &Path) -> Result<Table> {
    let format = TableFormat::from_path(path)?;
    let bytes = std::fs::read(path).map_err(|e| TrackfillError::io(path, e))?;
    let table = read_table_from_bytes(&bytes, format)?;

    info!(
        path = %path.display(),
        rows = table.len(),
        columns = table.headers().len(),
        "loaded input table"
    );
    Ok(table)
}

/// Decode a table from raw file bytes.
pub fn read_table_from_bytes(bytes: &[u8], format: TableFormat) -> Result<Table> {
    match format {
        TableFormat::Csv => csv_codec::read_csv(bytes),
        TableFormat::Xlsx => xlsx_codec::read_xlsx(bytes),
    }
}

/// Encode a table in the given format.
pub fn write_table(table: &Table, format: TableFormat) -> Result<Vec<u8>> {
    match format {
        TableFormat::Csv => csv_codec::write_csv(table),
        TableFormat::Xlsx => xlsx_codec::write_xlsx(table),
    }
}

/// Encode and write a table; the file is only touched once encoding succeeded.
pub fn write_table_to(path: &Path, table: &Table, format: TableFormat) -> Result<()> {
    let bytes = write_table(table, format)?;
    std::fs::write(path, &bytes).map_err(|e| TrackfillError::io(path, e))?;
    debug!(path = %path.display(), bytes = bytes.len(), "wrote output table");
    Ok(())
}
