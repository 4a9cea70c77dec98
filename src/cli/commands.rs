//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::{ConfigParser, ServerTagTask, TagTask, VolumeTagTask};
use crate::error::Result;
use crate::planner::{DesiredState, ServerTags, VolumeTag, VolumeTags};

/// os-tag - Declarative tags for OpenStack servers and volumes.
#[derive(Parser, Debug)]
#[command(name = "os-tag")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Named cloud from clouds.yaml.
    #[arg(long, global = true, env = "OS_CLOUD")]
    pub os_cloud: Option<String>,

    /// Path to clouds.yaml (overrides the standard search path).
    #[arg(long, global = true)]
    pub clouds_file: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Set or remove tags on a compute server.
    Server {
        /// Name or ID of the server.
        server: String,

        /// Whether the tags should be present or absent.
        #[arg(long, value_enum, default_value_t = DesiredState::Present)]
        state: DesiredState,

        /// Tag to set or remove (repeatable).
        #[arg(short, long = "tag", value_name = "TAG")]
        tags: Vec<String>,

        /// Report what would change without changing it.
        #[arg(long)]
        check: bool,

        /// Ignored. Accepted for backwards compatibility.
        #[arg(long, hide = true)]
        availability_zone: Option<String>,
    },

    /// Set or remove key/value tags on a block-storage volume.
    Volume {
        /// Name or ID of the volume.
        volume: String,

        /// Whether the tags should be present or absent.
        #[arg(long, value_enum, default_value_t = DesiredState::Present)]
        state: DesiredState,

        /// Tag to set or remove as KEY=VALUE (repeatable).
        #[arg(short, long = "tag", value_name = "KEY=VALUE")]
        tags: Vec<VolumeTag>,

        /// Report what would change without changing it.
        #[arg(long)]
        check: bool,

        /// Ignored. Accepted for backwards compatibility.
        #[arg(long, hide = true)]
        availability_zone: Option<String>,
    },

    /// Apply a tag task from a YAML file.
    Run {
        /// Path to the task file.
        task: PathBuf,

        /// Report what would change without changing it.
        #[arg(long)]
        check: bool,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Loads `.env` and then parses `args`.
    ///
    /// Variables set in `.env`, such as `OS_CLOUD`, are visible to the
    /// environment-backed flags. Exits with usage on invalid arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if `.env` exists but cannot be loaded.
    pub fn parse_with_dotenv<I, T>(parser: &ConfigParser, args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        parser.load_dotenv()?;
        Ok(Self::parse_from(args))
    }
}

impl Commands {
    /// Whether the command only reports changes.
    #[must_use]
    pub const fn check(&self) -> bool {
        match self {
            Self::Server { check, .. } | Self::Volume { check, .. } | Self::Run { check, .. } => {
                *check
            }
        }
    }

    /// The tag task given inline on the command line.
    ///
    /// Returns `None` for `run`, whose task lives in a file.
    #[must_use]
    pub fn inline_task(&self) -> Option<TagTask> {
        match self {
            Self::Server {
                server,
                state,
                tags,
                availability_zone,
                ..
            } => Some(TagTask::Server(ServerTagTask {
                server: server.clone(),
                state: *state,
                tags: tags.iter().cloned().collect::<ServerTags>(),
                availability_zone: availability_zone.clone(),
            })),
            Self::Volume {
                volume,
                state,
                tags,
                availability_zone,
                ..
            } => Some(TagTask::Volume(VolumeTagTask {
                volume: volume.clone(),
                state: *state,
                tags: tags.iter().cloned().collect::<VolumeTags>(),
                availability_zone: availability_zone.clone(),
            })),
            Self::Run { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_server_command() {
        let cli = parse(&[
            "os-tag", "server", "web-01", "--tag", "env.prod", "-t", "team.x", "--check",
        ]);
        assert!(cli.command.check());

        match cli.command.inline_task() {
            Some(TagTask::Server(task)) => {
                assert_eq!(task.server, "web-01");
                assert_eq!(task.state, DesiredState::Present);
                assert_eq!(task.tags.to_vec(), vec!["env.prod", "team.x"]);
            }
            other => panic!("unexpected task: {other:?}"),
        }
    }

    #[test]
    fn test_volume_command_parses_pairs() {
        let cli = parse(&[
            "os-tag",
            "--output",
            "json",
            "volume",
            "data",
            "--state",
            "absent",
            "--tag",
            "env=prod",
            "--tag",
            "note=a=b",
        ]);
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(!cli.command.check());

        match cli.command.inline_task() {
            Some(TagTask::Volume(task)) => {
                assert_eq!(task.state, DesiredState::Absent);
                assert_eq!(task.tags.get("env"), Some("prod"));
                assert_eq!(task.tags.get("note"), Some("a=b"));
            }
            other => panic!("unexpected task: {other:?}"),
        }
    }

    #[test]
    fn test_volume_tag_without_value_is_rejected() {
        assert!(Cli::try_parse_from(["os-tag", "volume", "data", "--tag", "env"]).is_err());
    }

    #[test]
    fn test_dotenv_is_loaded_before_os_cloud_is_read() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".env"), "OS_CLOUD=cloud-from-dotenv\n").unwrap();
        let parser = ConfigParser::new().with_base_path(dir.path());

        let cli = Cli::parse_with_dotenv(&parser, ["os-tag", "run", "task.yaml"]).unwrap();
        assert_eq!(cli.os_cloud.as_deref(), Some("cloud-from-dotenv"));
    }

    #[test]
    fn test_run_command_has_no_inline_task() {
        let cli = parse(&["os-tag", "--os-cloud", "prod", "run", "task.yaml"]);
        assert_eq!(cli.os_cloud.as_deref(), Some("prod"));
        assert!(cli.command.inline_task().is_none());
    }
}
