//! Spreadsheet flattening: workbook → one CSV block per sheet.
//!
//! Each sheet becomes a `--- SHEET: <name> ---` header followed by its used
//! cell range as CSV, so the model sees both sheet boundaries and the grid.
//! Sheets keep their workbook order. Blank rows inside the range are kept;
//! they often separate logical tables.

use crate::error::IngestError;
use calamine::{open_workbook_auto_from_rs, Data, ExcelDateTime, Range, Reader};
use chrono::Timelike;
use std::io::Cursor;
use tracing::{debug, warn};

/// Parse an `.xlsx` / `.xls` workbook and flatten every sheet to text.
pub fn flatten_workbook(bytes: &[u8]) -> Result<String, IngestError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| {
        IngestError::SpreadsheetParse {
            detail: e.to_string(),
        }
    })?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        match workbook.worksheet_range(&name) {
            Ok(range) => sheets.push((name, range)),
            Err(e) => {
                // Chart sheets and other non-grid sheets have no cell range.
                warn!("Skipping sheet '{}': {}", name, e);
            }
        }
    }
    debug!("Workbook has {} readable sheets", sheets.len());

    flatten_sheets(sheets.iter().map(|(name, range)| (name.as_str(), range)))
}

/// Render named cell grids as header + CSV blocks.
pub fn flatten_sheets<'a>(
    sheets: impl IntoIterator<Item = (&'a str, &'a Range<Data>)>,
) -> Result<String, IngestError> {
    let mut out = String::new();
    for (name, range) in sheets {
        out.push_str(&format!("--- SHEET: {name} ---\n\n"));
        out.push_str(&range_to_csv(range)?);
        out.push_str("\n\n");
    }
    Ok(out)
}

fn range_to_csv(range: &Range<Data>) -> Result<String, IngestError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for row in range.rows() {
        let record: Vec<String> = row.iter().map(cell_text).collect();
        writer
            .write_record(&record)
            .map_err(|e| IngestError::SpreadsheetParse {
                detail: e.to_string(),
            })?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| IngestError::SpreadsheetParse {
            detail: e.to_string(),
        })?;
    let csv = String::from_utf8_lossy(&bytes);
    Ok(csv.strip_suffix('\n').unwrap_or(&csv).to_string())
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::DateTime(dt) => date_text(dt),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render a date-formatted cell the way a spreadsheet shows it rather than
/// as its serial number. Midnight values print as a bare date.
fn date_text(dt: &ExcelDateTime) -> String {
    if dt.is_duration() {
        if let Some(d) = dt.as_duration() {
            let secs = d.num_seconds();
            return format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60);
        }
    } else if let Some(ndt) = dt.as_datetime() {
        return if ndt.num_seconds_from_midnight() == 0 {
            ndt.format("%Y-%m-%d").to_string()
        } else {
            ndt.format("%Y-%m-%d %H:%M:%S").to_string()
        };
    }
    dt.as_f64().to_string()
}
