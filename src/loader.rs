//! Spreadsheet loading.
//!
//! Reads the first worksheet of a workbook (or a CSV file) into a [`Table`],
//! taking the first row as the header.

use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use tracing::debug;

use crate::error::{DispatchError, Result};
use crate::models::{Cell, Table};

/// Load a table from an `.xlsx`/`.xls`/`.ods` workbook or a `.csv` file
pub fn load_table(path: &Path) -> Result<Table> {
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    let table = if is_csv { load_csv(path)? } else { load_workbook(path)? };

    debug!(
        path = %path.display(),
        columns = table.headers.len(),
        rows = table.len(),
        "Loaded table"
    );
    Ok(table)
}

fn load_workbook(path: &Path) -> Result<Table> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DispatchError::EmptyWorkbook(format!("{} has no worksheets", path.display())))??;

    let mut rows = range.rows();
    let header_row = rows
        .next()
        .ok_or_else(|| DispatchError::EmptyWorkbook(format!("{} has no header row", path.display())))?;
    let headers = header_names(header_row.iter().map(data_to_cell));

    let mut table = Table::new(headers);
    table.rows = rows.map(|row| row.iter().map(data_to_cell).collect()).collect();
    trim_trailing_blank_rows(&mut table);
    Ok(table)
}

fn load_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

    let headers = header_names(reader.headers()?.iter().map(csv_field_to_cell));
    let mut table = Table::new(headers);
    for record in reader.records() {
        let record = record?;
        table.rows.push(record.iter().map(csv_field_to_cell).collect());
    }
    trim_trailing_blank_rows(&mut table);
    Ok(table)
}

/// Blank rows inside the data are kept so exported tables line up with the source sheet;
/// only the blank tail is dropped
fn trim_trailing_blank_rows(table: &mut Table) {
    while table.rows.last().is_some_and(|row| row.iter().all(Cell::is_missing)) {
        table.rows.pop();
    }
}

/// Header labels; blank header cells become `Unnamed: <index>`
fn header_names(cells: impl Iterator<Item = Cell>) -> Vec<String> {
    cells
        .enumerate()
        .map(|(i, cell)| {
            let name = cell.display();
            if name.trim().is_empty() {
                format!("Unnamed: {i}")
            } else {
                name
            }
        })
        .collect()
}

/// Convert a calamine value into a [`Cell`]
#[must_use]
pub fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) if s.is_empty() => Cell::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        #[allow(clippy::cast_precision_loss)]
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => Cell::DateTime(dt.as_f64()),
        Data::Error(e) => Cell::Error(e.to_string()),
    }
}

fn csv_field_to_cell(field: &str) -> Cell {
    if field.is_empty() {
        Cell::Empty
    } else {
        Cell::Text(field.to_string())
    }
}
