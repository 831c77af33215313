//! CLI module - argument parsing and logger wiring

pub mod args;

pub use args::{Cli, Commands};
