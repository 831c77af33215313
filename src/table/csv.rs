//! Delimited text export: `;` field separator, `,` decimal separator.
//!
//! The downstream analysis tooling expects locale-style numbers, so floats
//! are rendered with a decimal comma. Everything else uses the plain cell
//! rendering (dates ISO, missing values as empty fields).

use std::path::Path;

use super::cell::{render_float, CellValue};
use super::error::TableError;
use super::Table;

fn format_cell(cell: &CellValue) -> String {
    match cell {
        CellValue::Float(f) => render_float(*f).replace('.', ","),
        other => other.render(),
    }
}

/// Write the table as `;`-delimited text with a header row and no index
/// column.
pub fn write_delimited(table: &Table, path: &Path) -> Result<(), TableError> {
    let delimited_error = |source: csv::Error| TableError::DelimitedWrite {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .map_err(delimited_error)?;

    writer
        .write_record(table.column_names())
        .map_err(delimited_error)?;

    for row in 0..table.height() {
        let record: Vec<String> = table
            .columns()
            .iter()
            .map(|cells| format_cell(&cells[row]))
            .collect();
        writer.write_record(&record).map_err(delimited_error)?;
    }

    writer.flush().map_err(|source| TableError::FileAccess {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    #[test]
    fn writes_semicolons_and_decimal_commas() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("salida.csv");

        let mut table = Table::with_names(vec!["fecha".into(), "agua".into(), "nota".into()]);
        table.push_row(vec![
            CellValue::Date(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()),
            CellValue::Float(12.5),
            CellValue::String("sin tratar".into()),
        ]);
        table.push_row(vec![CellValue::Null, CellValue::Float(95.0), CellValue::Null]);

        write_delimited(&table, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();

        assert_eq!(lines.next(), Some("fecha;agua;nota"));
        assert_eq!(lines.next(), Some("2024-01-10;12,5;sin tratar"));
        assert_eq!(lines.next(), Some(";95,0;"));
    }
}
