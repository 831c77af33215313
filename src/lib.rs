//! granja-etl: Poultry-farm production ETL library
//!
//! A batch pipeline turning per-farm daily-log workbooks into one cleaned,
//! analysis-ready table. Three stages compose in sequence: a single-source
//! cleaner, a merger, and a combined-source reconciler that forward-fills
//! animal counts and assigns life-weeks from entry events.

pub mod cli;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod table;
pub mod utils;
