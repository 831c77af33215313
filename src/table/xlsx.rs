//! Workbook reading and writing.
//!
//! Reading goes through calamine; writing through rust_xlsxwriter, whose
//! output is reproducible byte-for-byte, so re-running a stage on identical
//! input yields an identical file.

use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx, XlsxError};
use rust_xlsxwriter::Workbook;

use super::cell::CellValue;
use super::error::TableError;
use super::Table;

/// One worksheet read verbatim: no header interpretation, no typing beyond
/// the cell level.
#[derive(Debug, Clone)]
pub struct RawSheet {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

fn data_to_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Null,
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) => CellValue::String(s.clone()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => CellValue::Date(ndt.date()),
            None => CellValue::Null,
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::String(s.clone()),
        // Cell-level errors (#DIV/0! and friends) are data-quality noise
        Data::Error(_) => CellValue::Null,
    }
}

fn read_error(path: &Path, err: XlsxError) -> TableError {
    match err {
        XlsxError::Io(source) => TableError::FileAccess {
            path: path.to_path_buf(),
            source,
        },
        other => TableError::WorkbookRead {
            path: path.to_path_buf(),
            message: other.to_string(),
        },
    }
}

/// Read every sheet of a workbook verbatim, in workbook order.
pub fn read_sheets(path: &Path) -> Result<Vec<RawSheet>, TableError> {
    let mut workbook: Xlsx<_> = open_workbook(path).map_err(|e| read_error(path, e))?;
    let names: Vec<String> = workbook.sheet_names().to_vec();

    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| read_error(path, e))?;
        let rows = range
            .rows()
            .map(|row| row.iter().map(data_to_cell).collect())
            .collect();
        sheets.push(RawSheet { name, rows });
    }
    Ok(sheets)
}

/// Read the first sheet of a workbook as a table whose first row is the
/// header. Empty header cells are named positionally (`Unnamed: N`).
pub fn read_table(path: &Path) -> Result<Table, TableError> {
    let sheets = read_sheets(path)?;
    let first = sheets
        .into_iter()
        .next()
        .ok_or_else(|| TableError::EmptyWorkbook {
            path: path.to_path_buf(),
        })?;

    let mut rows = first.rows.into_iter();
    let header = rows.next().unwrap_or_default();
    let names = header
        .iter()
        .enumerate()
        .map(|(i, cell)| match cell {
            CellValue::Null => format!("Unnamed: {}", i),
            other => other.render(),
        })
        .collect();

    let mut table = Table::with_names(names);
    for row in rows {
        table.push_row(row);
    }
    Ok(table)
}

fn write_error(path: &Path, err: rust_xlsxwriter::XlsxError) -> TableError {
    TableError::WorkbookWrite {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

/// Write a table as a single-sheet workbook: header row plus data rows, no
/// index column. Dates are written as ISO strings so a later stage re-reads
/// them deterministically.
pub fn write_table(table: &Table, path: &Path) -> Result<(), TableError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, name) in table.column_names().iter().enumerate() {
        worksheet
            .write_string(0, col as u16, name)
            .map_err(|e| write_error(path, e))?;
    }

    for row in 0..table.height() {
        for (col, cells) in table.columns().iter().enumerate() {
            let cell = &cells[row];
            let (r, c) = ((row + 1) as u32, col as u16);
            match cell {
                CellValue::Null => {}
                CellValue::Bool(b) => {
                    worksheet
                        .write_boolean(r, c, *b)
                        .map_err(|e| write_error(path, e))?;
                }
                CellValue::Int(i) => {
                    worksheet
                        .write_number(r, c, *i as f64)
                        .map_err(|e| write_error(path, e))?;
                }
                CellValue::Float(f) => {
                    worksheet
                        .write_number(r, c, *f)
                        .map_err(|e| write_error(path, e))?;
                }
                CellValue::String(s) => {
                    worksheet
                        .write_string(r, c, s)
                        .map_err(|e| write_error(path, e))?;
                }
                CellValue::Date(d) => {
                    worksheet
                        .write_string(r, c, d.format("%Y-%m-%d").to_string())
                        .map_err(|e| write_error(path, e))?;
                }
            }
        }
    }

    workbook.save(path).map_err(|e| write_error(path, e))
}

/// Write several raw sheets into one workbook. Used to build multi-sheet
/// source fixtures and by callers that need full workbook control.
pub fn write_sheets(sheets: &[RawSheet], path: &Path) -> Result<(), TableError> {
    let mut workbook = Workbook::new();
    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(&sheet.name)
            .map_err(|e| write_error(path, e))?;
        for (row, cells) in sheet.rows.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                let (r, c) = (row as u32, col as u16);
                match cell {
                    CellValue::Null => {}
                    CellValue::Bool(b) => {
                        worksheet
                            .write_boolean(r, c, *b)
                            .map_err(|e| write_error(path, e))?;
                    }
                    CellValue::Int(i) => {
                        worksheet
                            .write_number(r, c, *i as f64)
                            .map_err(|e| write_error(path, e))?;
                    }
                    CellValue::Float(f) => {
                        worksheet
                            .write_number(r, c, *f)
                            .map_err(|e| write_error(path, e))?;
                    }
                    CellValue::String(s) => {
                        worksheet
                            .write_string(r, c, s)
                            .map_err(|e| write_error(path, e))?;
                    }
                    CellValue::Date(d) => {
                        worksheet
                            .write_string(r, c, d.format("%Y-%m-%d").to_string())
                            .map_err(|e| write_error(path, e))?;
                    }
                }
            }
        }
    }
    workbook.save(path).map_err(|e| write_error(path, e))
}
