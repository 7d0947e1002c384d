//! Tabular ticket exports: in-memory table, CSV/XLSX codecs, filtering, and
//! input file lookup.
//!
//! Every cell is kept as text exactly as it appears in the source file. Long
//! numeric tracking codes must never pass through a float.

pub mod filter;
pub mod format;
pub mod locate;

mod csv_codec;
mod xlsx_codec;

pub use filter::{FilterReport, apply_filters};
pub use format::{TableFormat, read_table, read_table_from_bytes, write_table, write_table_to};
pub use locate::{PROCESSED_SUFFIX, locate_input, processed_path};

// ---------------------------------------------------------------------------
// Row
// ---------------------------------------------------------------------------

/// One data row. Empty cells are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Position of the row in the source file (0-based, header excluded).
    pub index: usize,
    pub cells: Vec<Option<String>>,
}

impl Row {
    /// Cell text at `col`, if present and non-empty.
    pub fn cell(&self, col: usize) -> Option<&str> {
        self.cells.get(col).and_then(|cell| cell.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Header row plus data rows, all cells as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Build a table; short rows are padded to the header width, extra cells dropped.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(index, mut cells)| {
                cells.resize(width, None);
                Row { index, cells }
            })
            .collect();
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the column named exactly `name`.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Cell text at row position `row` (not source index) and column `col`.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.cell(col))
    }

    /// Overwrite one cell. Out-of-range positions are ignored.
    pub fn set_cell(&mut self, row: usize, col: usize, value: Option<String>) {
        if let Some(slot) = self.rows.get_mut(row).and_then(|r| r.cells.get_mut(col)) {
            *slot = value.filter(|v| !v.is_empty());
        }
    }

    /// Index of `name`, appending an empty column if it does not exist yet.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(col) = self.column(name) {
            return col;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.cells.push(None);
        }
        self.headers.len() - 1
    }

    /// Remove a column by name. Returns `false` if it was not present.
    pub fn drop_column(&mut self, name: &str) -> bool {
        let Some(col) = self.column(name) else {
            return false;
        };
        self.headers.remove(col);
        for row in &mut self.rows {
            if col < row.cells.len() {
                row.cells.remove(col);
            }
        }
        true
    }

    /// Keep rows matching `keep`; returns how many were removed.
    pub fn retain_rows(&mut self, mut keep: impl FnMut(&Row) -> bool) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| keep(row));
        before - self.rows.len()
    }
}

/// Normalise raw cell text: empty means absent.
pub(crate) fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
