//! granja-etl: Poultry-farm production ETL CLI
//!
//! A command-line tool for cleaning, merging and reconciling poultry-farm
//! daily production workbooks into one analysis-ready table.

mod cli;
mod logging;
mod pipeline;
mod report;
mod table;
mod utils;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, Commands};
use logging::Logger;
use report::StageSummary;
use utils::{create_spinner, finish_with_success, print_banner, print_completion, print_step_header};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let logger = cli.logger()?;

    print_banner(env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Clean { input, output } => {
            let summary = clean_step(1, input, output, logger.as_ref())?;
            summary.display();
        }
        Commands::Merge {
            left,
            right,
            output,
        } => {
            let summary = merge_step(1, left, right, output, logger.as_ref())?;
            summary.display();
        }
        Commands::Process {
            input,
            entries,
            output,
            csv,
        } => {
            let summary = process_step(1, input, entries, output, csv, logger.as_ref())?;
            summary.display();
        }
        Commands::Run {
            input,
            right,
            entries,
            out_dir,
        } => {
            std::fs::create_dir_all(out_dir)
                .with_context(|| format!("creating output directory {}", out_dir.display()))?;
            let cleaned = out_dir.join("limpio.xlsx");
            let merged = out_dir.join("combinado.xlsx");
            let final_xlsx = out_dir.join("final.xlsx");
            let final_csv = out_dir.join("final.csv");

            let summaries = vec![
                clean_step(1, input, &cleaned, logger.as_ref())?,
                merge_step(2, &cleaned, right, &merged, logger.as_ref())?,
                process_step(3, &merged, entries, &final_xlsx, &final_csv, logger.as_ref())?,
            ];
            for summary in &summaries {
                summary.display();
            }
        }
    }

    print_completion();
    Ok(())
}

fn clean_step(
    step: u8,
    input: &Path,
    output: &Path,
    logger: &dyn Logger,
) -> Result<StageSummary> {
    print_step_header(step, "Clean daily log");
    let spinner = create_spinner("Cleaning source workbook...");
    let summary = pipeline::clean::run(input, output, logger).context("single-source cleaner")?;
    finish_with_success(&spinner, &format!("Cleaned table saved to {}", output.display()));
    Ok(summary)
}

fn merge_step(
    step: u8,
    left: &Path,
    right: &Path,
    output: &Path,
    logger: &dyn Logger,
) -> Result<StageSummary> {
    print_step_header(step, "Merge cleaned tables");
    let spinner = create_spinner("Joining on (fecha, granja)...");
    let summary = pipeline::merge::run(left, right, output, logger).context("merger")?;
    finish_with_success(&spinner, &format!("Merged table saved to {}", output.display()));
    Ok(summary)
}

fn process_step(
    step: u8,
    input: &Path,
    entries: &Path,
    output: &Path,
    csv: &Path,
    logger: &dyn Logger,
) -> Result<StageSummary> {
    print_step_header(step, "Reconcile and enrich");
    let spinner = create_spinner("Reconciling animal counts and life-weeks...");
    let summary =
        pipeline::reconcile::run(input, entries, output, csv, logger).context("reconciler")?;
    finish_with_success(&spinner, &format!("Final table saved to {}", output.display()));
    Ok(summary)
}
