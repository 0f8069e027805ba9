//! Spreadsheet writing utilities.
//!
//! Tables are written to a single worksheet with a bold header row, in the same
//! column order as the source. Dates keep a date number format.

use crate::error::{DispatchError, Result};
use crate::models::{Cell, Table};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::Path;

/// Write a table to an `.xlsx` file at `file_path`.
///
/// # Errors
///
/// Returns an error if the table does not fit in a worksheet or the file cannot be saved.
pub fn write_table(table: &Table, file_path: &Path) -> Result<()> {
    let mut workbook = build_workbook(table)?;
    workbook.save(file_path)?;
    Ok(())
}

/// Render a table as `.xlsx` bytes.
pub fn table_to_bytes(table: &Table) -> Result<Vec<u8>> {
    let mut workbook = build_workbook(table)?;
    Ok(workbook.save_to_buffer()?)
}

fn build_workbook(table: &Table) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    write_sheet(worksheet, table)?;
    Ok(workbook)
}

fn write_sheet(worksheet: &mut Worksheet, table: &Table) -> Result<()> {
    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

    for (col, header) in table.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, to_col(col)?, header, &header_format)?;
    }

    for (i, row) in table.rows.iter().enumerate() {
        let r = to_row(i + 1)?;
        for (col, cell) in row.iter().enumerate() {
            let c = to_col(col)?;
            match cell {
                Cell::Empty => {}
                Cell::Text(s) | Cell::Error(s) => {
                    worksheet.write_string(r, c, s)?;
                }
                Cell::Number(n) => {
                    worksheet.write_number(r, c, *n)?;
                }
                Cell::Bool(b) => {
                    worksheet.write_boolean(r, c, *b)?;
                }
                Cell::DateTime(serial) => {
                    worksheet.write_number_with_format(r, c, *serial, &date_format)?;
                }
            }
        }
    }

    Ok(())
}

fn to_row(index: usize) -> Result<u32> {
    u32::try_from(index).map_err(|_| DispatchError::Io(std::io::Error::other(format!("row {index} out of range"))))
}

fn to_col(index: usize) -> Result<u16> {
    u16::try_from(index).map_err(|_| DispatchError::Io(std::io::Error::other(format!("column {index} out of range"))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_table;

    #[test]
    fn test_written_table_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");

        let mut table = Table::new(vec!["Account".into(), "Amount".into(), "Active".into()]);
        table.rows.push(vec![Cell::Text("Acme".into()), Cell::Number(12.5), Cell::Bool(true)]);
        table.rows.push(vec![Cell::Text("Globex".into()), Cell::Empty, Cell::Bool(false)]);

        write_table(&table, &path).unwrap();
        let back = load_table(&path).unwrap();

        assert_eq!(back.headers, table.headers);
        assert_eq!(back.len(), 2);
        assert_eq!(back.cell(0, 1), &Cell::Number(12.5));
        assert_eq!(back.cell(1, 1), &Cell::Empty);
        assert_eq!(back.cell(1, 2), &Cell::Bool(false));
    }

    #[test]
    fn test_bytes_are_a_zip_container() {
        let table = Table::new(vec!["Only".into()]);
        let bytes = table_to_bytes(&table).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
