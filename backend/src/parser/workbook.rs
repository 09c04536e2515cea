//! Excel workbook input (.xlsx / .xls).
//!
//! Only the first worksheet is read. Its first row holds the column names.
//! Numeric and date cells stay numbers so that date serials reach the
//! date normalizer untouched.

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use std::io::Cursor;

use super::{CsvError, ParseResult};
use crate::models::{RawRow, RawValue};

/// Leading bytes of a ZIP container (.xlsx).
pub const XLSX_MAGIC: &[u8] = b"PK\x03\x04";

/// Leading bytes of an OLE compound file (legacy .xls).
pub const XLS_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Workbook container format, if `bytes` starts with a known signature.
pub fn workbook_format(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(XLSX_MAGIC) {
        Some("xlsx")
    } else if bytes.starts_with(XLS_MAGIC) {
        Some("xls")
    } else {
        None
    }
}

/// Parse the first worksheet of a workbook held in memory.
pub fn parse_workbook_bytes(bytes: &[u8]) -> Result<ParseResult, CsvError> {
    let format = workbook_format(bytes).unwrap_or("workbook");

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| CsvError::new(0, format!("Cannot open {} workbook: {}", format, e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| CsvError::new(0, "Workbook has no worksheets"))?
        .map_err(|e| CsvError::new(0, format!("Cannot read first worksheet: {}", e)))?;

    let (headers, rows) = rows_from_range(&range)?;

    Ok(ParseResult {
        rows,
        encoding: format.to_string(),
        delimiter: ',',
        headers,
    })
}

/// Headers and rows from a worksheet range.
///
/// Blank rows are skipped, as are columns without a header. Error cells
/// (`#DIV/0!`, `#REF!`...) are rejected with their position.
pub fn rows_from_range(range: &Range<Data>) -> Result<(Vec<String>, Vec<RawRow>), CsvError> {
    let first_line = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);
    let mut lines = range.rows();

    let headers: Vec<String> = match lines.next() {
        Some(cells) => cells.iter().map(header_text).collect(),
        None => return Err(CsvError::new(1, "Empty worksheet")),
    };
    if headers.iter().all(String::is_empty) {
        return Err(CsvError::new(first_line, "No headers found"));
    }

    let mut rows = Vec::new();
    for (offset, cells) in lines.enumerate() {
        let line = first_line + offset + 1;
        if cells.iter().all(is_blank_cell) {
            continue;
        }

        let mut row = RawRow::new();
        for (i, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let value = match cells.get(i) {
                Some(cell) => cell_value(cell).map_err(|value| {
                    CsvError::new(line, "Cell contains a spreadsheet error")
                        .with_column(header.as_str())
                        .with_value(value)
                })?,
                None => RawValue::Empty,
            };
            row = row.with(header.as_str(), value);
        }
        rows.push(row);
    }

    Ok((headers, rows))
}

/// Cell to raw value; `Err` carries the text of an error cell.
fn cell_value(cell: &Data) -> Result<RawValue, String> {
    match cell {
        Data::Empty => Ok(RawValue::Empty),
        Data::String(s) => Ok(RawValue::Text(s.clone())),
        Data::Float(f) => Ok(RawValue::Number(*f)),
        Data::Int(i) => Ok(RawValue::Number(*i as f64)),
        Data::Bool(b) => Ok(RawValue::Text(b.to_string())),
        Data::DateTime(dt) => Ok(RawValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Ok(RawValue::Text(s.clone())),
        Data::Error(e) => Err(e.to_string()),
    }
}

fn header_text(cell: &Data) -> String {
    match cell_value(cell) {
        Ok(value) => value.to_text().trim().to_string(),
        Err(_) => String::new(),
    }
}

fn is_blank_cell(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}
