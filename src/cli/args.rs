//! Command-line argument definitions using clap

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::logging::{ConsoleLogger, LogConfig, Logger, NoopLogger};

/// granja-etl - Clean, merge and reconcile poultry-farm daily production workbooks
#[derive(Parser, Debug)]
#[command(name = "granja-etl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Suppress progress logging
    #[arg(long, global = true, default_value = "false")]
    pub quiet: bool,

    /// JSON file configuring log sinks (console enabled by default)
    #[arg(long, global = true)]
    pub log_config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Clean a raw multi-sheet daily-log workbook into one standardized table
    Clean {
        /// Raw daily-log workbook (multi-sheet; first sheet's first row is the header)
        #[arg(short, long)]
        input: PathBuf,

        /// Cleaned workbook output path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Left-join two cleaned tables on (fecha, granja)
    Merge {
        /// Cleaned daily-log workbook (every row of this table is kept)
        #[arg(long)]
        left: PathBuf,

        /// Cleaned entry-detail workbook (columns appended where keys match)
        #[arg(long)]
        right: PathBuf,

        /// Merged workbook output path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Reconcile the merged table against entry events and export the final table
    Process {
        /// Merged workbook (output of the merge stage)
        #[arg(short, long)]
        input: PathBuf,

        /// Entry-event reference workbook (farm, date, initial count, initial life-week)
        #[arg(long)]
        entries: PathBuf,

        /// Final workbook output path
        #[arg(short, long)]
        output: PathBuf,

        /// Final delimited text output path (';' separator, ',' decimals)
        #[arg(long)]
        csv: PathBuf,
    },

    /// Run all three stages in sequence, writing intermediates to --out-dir
    Run {
        /// Raw daily-log workbook
        #[arg(short, long)]
        input: PathBuf,

        /// Cleaned entry-detail workbook for the merge stage
        #[arg(long)]
        right: PathBuf,

        /// Entry-event reference workbook for the reconcile stage
        #[arg(long)]
        entries: PathBuf,

        /// Directory receiving intermediate and final outputs
        #[arg(long)]
        out_dir: PathBuf,
    },
}

impl Cli {
    /// Build the logger from the global flags: `--quiet` wins, then an
    /// explicit config file, then the console default.
    pub fn logger(&self) -> Result<Box<dyn Logger>> {
        if self.quiet {
            return Ok(Box::new(NoopLogger));
        }
        match &self.log_config {
            Some(path) => Ok(LogConfig::from_path(path)?.build()),
            None => Ok(Box::new(ConsoleLogger::default())),
        }
    }
}
