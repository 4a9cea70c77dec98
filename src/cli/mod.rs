//! CLI module for the os-tag tool.
//!
//! This module provides the command-line interface for reconciling tags on
//! OpenStack servers and volumes.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
