//! Error types for table access and file I/O.
//!
//! Structural problems (a required column absent, an unreadable file) are
//! fatal and surface through this enum. Data-quality problems (a cell that
//! fails to parse as a date or number) are never errors; they become
//! [`CellValue::Null`](crate::table::CellValue::Null) and are handled by each
//! stage's own drop/fill rules.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by [`Table`](crate::table::Table) operations and the
/// workbook/delimited readers and writers.
#[derive(Debug, Error)]
pub enum TableError {
    /// A column the caller unconditionally requires is absent.
    #[error("required column '{column}' is missing")]
    MissingColumn { column: String },

    /// A column being added does not match the table's row count.
    #[error("column '{column}' has {got} values but the table has {expected} rows")]
    LengthMismatch {
        column: String,
        expected: usize,
        got: usize,
    },

    /// The input workbook has no sheets to read.
    #[error("workbook {path:?} contains no sheets")]
    EmptyWorkbook { path: PathBuf },

    /// The file could not be opened or created.
    #[error("cannot access {path:?}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The workbook exists but could not be parsed.
    #[error("failed to read workbook {path:?}: {message}")]
    WorkbookRead { path: PathBuf, message: String },

    /// The output workbook could not be written.
    #[error("failed to write workbook {path:?}: {message}")]
    WorkbookWrite { path: PathBuf, message: String },

    /// The delimited text output could not be written.
    #[error("failed to write delimited file {path:?}")]
    DelimitedWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl TableError {
    pub fn missing_column(column: impl Into<String>) -> Self {
        TableError::MissingColumn {
            column: column.into(),
        }
    }
}
