//! Spinner helpers wrapping indicatif

use indicatif::{ProgressBar, ProgressStyle};

/// Spinner shown while a pipeline stage works through its files.
pub fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("    {spinner:.cyan} {msg}")
            .unwrap()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));
    spinner
}

/// Replace the spinner with a final success line.
pub fn finish_with_success(spinner: &ProgressBar, message: &str) {
    spinner.finish_with_message(format!("✅ {}", message));
}
