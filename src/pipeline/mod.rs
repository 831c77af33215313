//! Pipeline module - the three ETL stages, composed in sequence
//!
//! Data flows strictly linearly: raw workbook → cleaned table → merged table
//! → reconciled table. Each stage fully materializes its output file before
//! the next stage starts.

pub mod clean;
pub mod merge;
pub mod reconcile;
