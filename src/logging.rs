//! Injected logging capability for the pipeline stages.
//!
//! Stages receive a `&dyn Logger` and emit coarse progress messages only;
//! logging never participates in control flow, so a [`NoopLogger`] leaves the
//! pipeline semantics untouched (that is also the test default).

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use console::style;
use serde::{Deserialize, Serialize};

/// Message severity, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        write!(f, "{}", name)
    }
}

/// Logging capability: `log(level, message)` plus level shorthands.
pub trait Logger {
    fn log(&self, level: LogLevel, message: &str);

    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

/// Discards everything. Default for tests and `--quiet`.
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _level: LogLevel, _message: &str) {}
}

/// Timestamped, colored console sink writing to stderr.
pub struct ConsoleLogger {
    min_level: LogLevel,
}

impl ConsoleLogger {
    pub fn new(min_level: LogLevel) -> Self {
        Self { min_level }
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, level: LogLevel, message: &str) {
        if level < self.min_level {
            return;
        }
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let tag = match level {
            LogLevel::Debug => style(level.to_string()).dim(),
            LogLevel::Info => style(level.to_string()).cyan(),
            LogLevel::Warn => style(level.to_string()).yellow().bold(),
            LogLevel::Error => style(level.to_string()).red().bold(),
        };
        eprintln!("{} {:5} {}", style(timestamp).dim(), tag, message);
    }
}

/// Sink configuration, loadable from a JSON file.
///
/// The remote notification sink is declarative only: it exists so existing
/// config files keep deserializing, and it defaults to disabled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub console: ConsoleSinkConfig,
    pub notifications: NotificationSinkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSinkConfig {
    pub enabled: bool,
    pub log_level: LogLevel,
}

impl Default for ConsoleSinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: LogLevel::Info,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSinkConfig {
    pub enabled: bool,
    pub log_level: LogLevel,
    pub project: Option<String>,
    pub pipeline: Option<String>,
    pub recipients: Vec<String>,
}

impl Default for NotificationSinkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_level: LogLevel::Info,
            project: None,
            pipeline: None,
            recipients: Vec::new(),
        }
    }
}

impl LogConfig {
    /// Load a sink configuration from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read log config: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("invalid log config: {}", path.display()))
    }

    /// Build the configured logger.
    pub fn build(&self) -> Box<dyn Logger> {
        if self.console.enabled {
            Box::new(ConsoleLogger::new(self.console.log_level))
        } else {
            Box::new(NoopLogger)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_console_on_and_notifications_off() {
        let config = LogConfig::default();
        assert!(config.console.enabled);
        assert!(!config.notifications.enabled);
        assert_eq!(config.console.log_level, LogLevel::Info);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: LogConfig =
            serde_json::from_str(r#"{"console": {"log_level": "DEBUG"}}"#).unwrap();
        assert!(config.console.enabled);
        assert_eq!(config.console.log_level, LogLevel::Debug);
        assert!(!config.notifications.enabled);
    }

    #[test]
    fn levels_order_by_severity() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Warn < LogLevel::Error);
    }
}
