//! Stage 2: merger.
//!
//! Left-joins the cleaned daily log with the cleaned entry-detail table on
//! `(fecha, granja)`. Both key columns are normalized first: dates become
//! pure dates, farm names become trimmed strings.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::logging::Logger;
use crate::report::StageSummary;
use crate::table::{xlsx, CellValue, Table};

/// Columns of the right-hand table that are never carried into the merge.
/// Their absence is not an error.
const RIGHT_EXTRANEOUS: &[&str] = &["Nº Animales Actual", "Unnamed: 6", "Unnamed: 7"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y", "%Y-%m-%d %H:%M:%S"];

/// Coerce a cell to a pure date; unparsable values become missing.
pub fn coerce_date(cell: &CellValue) -> CellValue {
    match cell {
        CellValue::Date(d) => CellValue::Date(*d),
        CellValue::String(s) => {
            let trimmed = s.trim();
            for format in DATE_FORMATS {
                if let Ok(d) = NaiveDate::parse_from_str(trimmed, format) {
                    return CellValue::Date(d);
                }
            }
            CellValue::Null
        }
        _ => CellValue::Null,
    }
}

/// Coerce a cell to a trimmed string; missing values become the empty string
/// so the column is uniformly typed for the join.
pub fn coerce_trimmed_string(cell: &CellValue) -> CellValue {
    CellValue::String(cell.render().trim().to_string())
}

/// Normalize the `(fecha, granja)` join keys of one table in place.
pub fn normalize_keys(table: &mut Table) -> Result<()> {
    table.apply("fecha", coerce_date)?;
    table.apply("granja", coerce_trimmed_string)?;
    Ok(())
}

/// Join both tables: every left row kept, matching right columns appended,
/// result sorted by `(granja, fecha)`.
pub fn merge_tables(left: &Table, right: &Table) -> Result<Table> {
    let mut merged = left.left_join(right, &["fecha", "granja"])?;
    merged.sort_by(&["granja", "fecha"])?;
    Ok(merged)
}

/// Run the whole stage: load both cleaned tables, align keys, join, write.
pub fn run(
    left_path: &Path,
    right_path: &Path,
    output: &Path,
    logger: &dyn Logger,
) -> Result<StageSummary> {
    logger.info(&format!(
        "merging {} with {}",
        left_path.display(),
        right_path.display()
    ));

    let mut left = xlsx::read_table(left_path)
        .with_context(|| format!("loading {}", left_path.display()))?;
    let mut right = xlsx::read_table(right_path)
        .with_context(|| format!("loading {}", right_path.display()))?;
    let (rows_in, columns_in) = (left.height(), left.width());

    right.drop_columns_if_present(RIGHT_EXTRANEOUS);
    normalize_keys(&mut left).context("normalizing left keys")?;
    normalize_keys(&mut right).context("normalizing right keys")?;

    let merged = merge_tables(&left, &right)?;

    logger.info(&format!("writing merged table to {}", output.display()));
    xlsx::write_table(&merged, output)
        .with_context(|| format!("writing {}", output.display()))?;

    Ok(StageSummary {
        stage: "merger",
        rows_in,
        rows_out: merged.height(),
        columns_in,
        columns_out: merged.width(),
    })
}
