use std::io::Cursor;

use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};
use rust_xlsxwriter::{Workbook, XlsxError};
use trackfill_shared::{Result, TrackfillError};

use crate::{Table, non_empty};

fn xlsx_err(e: XlsxError) -> TrackfillError {
    TrackfillError::Table(format!("xlsx: {e}"))
}

/// Read the first worksheet. The first row of its used range is the header.
pub(crate) fn read_xlsx(bytes: &[u8]) -> Result<Table> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
        .map_err(|e| TrackfillError::Table(format!("xlsx: failed to open workbook: {e}")))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| TrackfillError::Table("xlsx: workbook has no worksheets".into()))?
        .map_err(|e| TrackfillError::Table(format!("xlsx: failed to read worksheet: {e}")))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Table::default());
    };

    let headers = header_row
        .iter()
        .map(|cell| cell_text(cell).unwrap_or_default())
        .collect();
    let body = rows
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    Ok(Table::new(headers, body))
}

/// Write a single-sheet workbook. Every cell is written as a string.
pub(crate) fn write_xlsx(table: &Table) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, header) in table.headers().iter().enumerate() {
        sheet
            .write_string(0, column_number(col)?, header.as_str())
            .map_err(xlsx_err)?;
    }

    for (position, row) in table.rows().iter().enumerate() {
        let row_number = u32::try_from(position + 1)
            .map_err(|_| TrackfillError::Table("xlsx: too many rows".into()))?;
        for (col, cell) in row.cells.iter().enumerate() {
            if let Some(value) = cell {
                sheet
                    .write_string(row_number, column_number(col)?, value.as_str())
                    .map_err(xlsx_err)?;
            }
        }
    }

    workbook.save_to_buffer().map_err(xlsx_err)
}

fn column_number(col: usize) -> Result<u16> {
    u16::try_from(col).map_err(|_| TrackfillError::Table("xlsx: too many columns".into()))
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => non_empty(s),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(format_float(*f)),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) if dt.is_duration() => Some(format_float(dt.as_f64())),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => Some(value.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => Some(format_float(dt.as_f64())),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => non_empty(s),
        Data::Error(e) => Some(e.to_string()),
    }
}

/// Render a numeric cell without exponent notation; integral values drop the `.0`.
fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
