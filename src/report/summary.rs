//! Per-stage run summary

use console::style;

/// Row and column accounting for one pipeline stage.
#[derive(Debug, Clone)]
pub struct StageSummary {
    pub stage: &'static str,
    pub rows_in: usize,
    pub rows_out: usize,
    pub columns_in: usize,
    pub columns_out: usize,
}

impl StageSummary {
    pub fn rows_dropped(&self) -> usize {
        self.rows_in.saturating_sub(self.rows_out)
    }

    /// Print a styled summary block to stdout.
    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style(self.stage.to_uppercase()).white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!(
            "      Rows:    {} in  →  {} out  ({} dropped)",
            style(self.rows_in).yellow(),
            style(self.rows_out).green().bold(),
            style(self.rows_dropped()).red()
        );
        println!(
            "      Columns: {} in  →  {} out",
            style(self.columns_in).yellow(),
            style(self.columns_out).green().bold()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_dropped_saturates() {
        let summary = StageSummary {
            stage: "merge",
            rows_in: 3,
            rows_out: 5, // duplicate right keys can grow the row count
            columns_in: 4,
            columns_out: 6,
        };
        assert_eq!(summary.rows_dropped(), 0);
    }
}
