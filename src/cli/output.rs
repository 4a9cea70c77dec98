//! Output formatting for CLI commands.
//!
//! JSON output is the module-style result document; text output is a short
//! status line followed by a table of the resource's tags.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::error::TagError;
use crate::planner::{ServerTags, TagCollection, VolumeTags};
use crate::reconciler::TagOutcome;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Server tag row for table display.
#[derive(Tabled)]
struct ServerTagRow {
    #[tabled(rename = "Tag")]
    tag: String,
}

/// Volume tag row for table display.
#[derive(Tabled)]
struct VolumeTagRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the outcome of a server tag run.
    #[must_use]
    pub fn format_server_outcome(&self, outcome: &TagOutcome<ServerTags>) -> String {
        match self.format {
            OutputFormat::Json => Self::format_report(outcome),
            OutputFormat::Text => {
                let rows = outcome.tags.iter().map(|tag| ServerTagRow {
                    tag: tag.to_string(),
                });
                Self::format_outcome_text(outcome, Table::new(rows).to_string())
            }
        }
    }

    /// Formats the outcome of a volume tag run.
    #[must_use]
    pub fn format_volume_outcome(&self, outcome: &TagOutcome<VolumeTags>) -> String {
        match self.format {
            OutputFormat::Json => Self::format_report(outcome),
            OutputFormat::Text => {
                let rows = outcome.tags.iter().map(|(key, value)| VolumeTagRow {
                    key: key.to_string(),
                    value: value.to_string(),
                });
                Self::format_outcome_text(outcome, Table::new(rows).to_string())
            }
        }
    }

    /// Formats a failure.
    ///
    /// JSON failures carry `failed`, `msg`, and the service's error body as
    /// `extra_data` when one was returned.
    #[must_use]
    pub fn format_failure(&self, error: &TagError) -> String {
        match self.format {
            OutputFormat::Json => {
                let mut report = serde_json::json!({
                    "failed": true,
                    "msg": error.to_string(),
                });
                if let Some(extra) = error.extra_data() {
                    report["extra_data"] = extra.clone();
                }
                serde_json::to_string_pretty(&report).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = format!("{} {error}\n", "✗".red());
                if let Some(extra) = error.extra_data() {
                    let _ = writeln!(output, "   extra_data: {extra}");
                }
                output
            }
        }
    }

    /// Formats validation warnings.
    #[must_use]
    pub fn format_warnings(&self, warnings: &[String]) -> String {
        match self.format {
            OutputFormat::Json => String::new(),
            OutputFormat::Text => warnings.iter().fold(String::new(), |mut output, warning| {
                let _ = writeln!(output, "{} {warning}", "⚠".yellow());
                output
            }),
        }
    }

    fn format_report<C: TagCollection>(outcome: &TagOutcome<C>) -> String {
        serde_json::to_string_pretty(&outcome.to_report()).unwrap_or_default()
    }

    fn format_outcome_text<C: TagCollection>(outcome: &TagOutcome<C>, table: String) -> String {
        let status = match (outcome.changed, outcome.dry_run) {
            (true, true) => "would change".yellow().to_string(),
            (true, false) => "changed".yellow().to_string(),
            (false, _) => "unchanged".green().to_string(),
        };

        let mut output = format!(
            "{} {} {}: {status}\n",
            "✓".green(),
            outcome.kind,
            outcome.resource_id
        );

        if outcome.tags.is_empty() {
            output.push_str("   No tags.\n");
        } else {
            output.push_str(&table);
            output.push('\n');
        }

        let _ = writeln!(output, "\nTags: {}", outcome.tags.len());
        output
    }
}
