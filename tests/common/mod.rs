//! Shared test utilities and fixture generators

#![allow(dead_code)]

use std::path::PathBuf;

use chrono::NaiveDate;
use granja_etl::table::xlsx::{self, RawSheet};
use granja_etl::table::{CellValue, Table};
use tempfile::TempDir;

pub fn s(v: &str) -> CellValue {
    CellValue::String(v.to_string())
}

pub fn f(v: f64) -> CellValue {
    CellValue::Float(v)
}

pub fn n() -> CellValue {
    CellValue::Null
}

pub fn date(y: i32, m: u32, d: u32) -> CellValue {
    CellValue::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

/// Raw header row of a daily-log workbook, as the farm spreadsheets carry it:
/// mixed case, clock-style temperature names, a notes column and one
/// whitespace-only header.
pub const DAILY_HEADER: &[&str] = &[
    "Fecha",
    "Granja",
    "Granjero",
    "Corte de pienso",
    "Introduce solo agua calculo pienso automático",
    "Tratamiento piojos",
    "Tratamiento agua",
    "Tratamientos",
    "Bajas",
    "Agua",
    "Pienso",
    "Temp 9:00",
    "Temp 12.00",
    "Totales",
    "Suelo",
    "Observaciones del dia",
    "   ",
];

/// Canonical names of [`DAILY_HEADER`] after stage-1 standardization, used to
/// address cells positionally when building fixture rows.
const CANONICAL: &[&str] = &[
    "fecha",
    "granja",
    "granjero",
    "corte de pienso",
    "introduce solo agua calculo pienso automático",
    "tratamiento piojos",
    "tratamiento agua",
    "tratamientos",
    "bajas",
    "agua",
    "pienso",
    "temp_9",
    "temp_12",
    "totales",
    "suelo",
    "observaciones del dia",
    "",
];

fn pos(name: &str) -> usize {
    CANONICAL
        .iter()
        .position(|c| *c == name)
        .unwrap_or_else(|| panic!("unknown fixture column '{}'", name))
}

pub fn header_row() -> Vec<CellValue> {
    DAILY_HEADER.iter().map(|h| s(h)).collect()
}

/// A daily-log row that survives every stage-1 filter. `fecha` uses the raw
/// DD-MM-YYYY layout of the source workbooks.
pub fn daily_row(fecha: &str, granja: &str) -> Vec<CellValue> {
    vec![
        s(fecha),
        s(granja),
        s("jose maria perez"),
        s("SI"),
        n(),
        n(),
        s("NO"),
        s("vacuna (12)"),
        f(2.0),
        f(100.0),
        f(50.0),
        f(21.0),
        f(21.6),
        f(500.0),
        f(100.0),
        s("sin novedades"),
        n(),
    ]
}

/// Replace one cell of a fixture row, addressed by canonical column name.
pub fn with(mut row: Vec<CellValue>, name: &str, value: CellValue) -> Vec<CellValue> {
    row[pos(name)] = value;
    row
}

/// Write a multi-sheet daily-log workbook. Every sheet gets the raw header
/// row prepended, mirroring real workbooks where each sheet repeats it.
pub fn write_daily_workbook(sheets: Vec<Vec<Vec<CellValue>>>) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("diario.xlsx");

    let raw: Vec<RawSheet> = sheets
        .into_iter()
        .enumerate()
        .map(|(i, rows)| {
            let mut all_rows = vec![header_row()];
            all_rows.extend(rows);
            RawSheet {
                name: format!("hoja{}", i + 1),
                rows: all_rows,
            }
        })
        .collect();

    xlsx::write_sheets(&raw, &path).unwrap();
    (dir, path)
}

/// Write an already-cleaned table as a single-sheet workbook.
pub fn write_table_workbook(table: &Table, name: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(name);
    xlsx::write_table(table, &path).unwrap();
    (dir, path)
}

/// Build a table from column names and row-major cells.
pub fn table_of(names: &[&str], rows: Vec<Vec<CellValue>>) -> Table {
    let mut table = Table::with_names(names.iter().map(|n| n.to_string()).collect());
    for row in rows {
        table.push_row(row);
    }
    table
}

/// Assert that a table contains specific columns
pub fn assert_has_columns(table: &Table, expected: &[&str]) {
    for col in expected {
        assert!(
            table.has_column(col),
            "Missing expected column: '{}'. Actual columns: {:?}",
            col,
            table.column_names()
        );
    }
}

/// Assert that a table does NOT contain specific columns
pub fn assert_missing_columns(table: &Table, unexpected: &[&str]) {
    for col in unexpected {
        assert!(
            !table.has_column(col),
            "Unexpected column still present: '{}'",
            col
        );
    }
}
