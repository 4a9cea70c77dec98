//! os-tag CLI entrypoint.
//!
//! This is the main entrypoint for the os-tag command-line tool.

use std::io::Write;
use std::process::ExitCode;

use os_tag::cli::{Cli, Commands, OutputFormat, OutputFormatter};
use os_tag::cloud::{OpenStackClient, ServerTagBackend, VolumeTagBackend};
use os_tag::config::{ConfigParser, ConfigValidator, TagTask};
use os_tag::error::{ConfigError, Result};
use os_tag::reconciler::{TagReconciler, TagRequest};

use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = match Cli::parse_with_dotenv(&ConfigParser::new(), std::env::args_os()) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    init_logging(cli.verbose);

    let formatter = OutputFormatter::new(cli.output);

    // Run async runtime
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(&cli, &formatter)) {
        Ok(output) => {
            emit(&output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            let failure = formatter.format_failure(&e);
            match cli.output {
                OutputFormat::Json => emit(&failure),
                OutputFormat::Text => eprint!("{failure}"),
            }
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// Logs go to stderr so stdout carries only the result document.
/// `RUST_LOG` takes precedence over `--verbose`.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Writes a result document to stdout.
fn emit(output: &str) {
    let mut stdout = std::io::stdout().lock();
    let _ = writeln!(stdout, "{}", output.trim_end());
}

/// Main async entry point.
async fn run(cli: &Cli, formatter: &OutputFormatter) -> Result<String> {
    let parser = ConfigParser::new();

    let task = match &cli.command {
        Commands::Run { task, .. } => parser.load_task(task)?,
        command => command
            .inline_task()
            .ok_or_else(|| ConfigError::missing("task"))?,
    };

    let validator = ConfigValidator::new();
    let validation = validator.validate_task(&task)?;
    for warning in &validation.warnings {
        warn!("{warning}");
    }
    if cli.output == OutputFormat::Text && !validation.warnings.is_empty() {
        eprint!("{}", formatter.format_warnings(&validation.warnings));
    }

    let cloud = parser.resolve_cloud(
        cli.clouds_file.as_deref(),
        cli.os_cloud.as_deref(),
        |name| std::env::var(name).ok(),
    )?;
    validator.validate_cloud(&cloud)?;

    let client = OpenStackClient::connect(&cloud).await?;
    let check = cli.command.check();
    if check {
        info!("Check mode: no changes will be made");
    }

    match task {
        TagTask::Server(task) => {
            debug!("Reconciling server tags on {}", task.server);
            let backend = ServerTagBackend::new(&client);
            let request = TagRequest::new(task.server, task.state, task.tags).with_dry_run(check);
            let outcome = TagReconciler::new(&backend).reconcile(&request).await?;
            info!("{outcome}");
            Ok(formatter.format_server_outcome(&outcome))
        }
        TagTask::Volume(task) => {
            debug!("Reconciling volume tags on {}", task.volume);
            let backend = VolumeTagBackend::new(&client);
            let request = TagRequest::new(task.volume, task.state, task.tags).with_dry_run(check);
            let outcome = TagReconciler::new(&backend).reconcile(&request).await?;
            info!("{outcome}");
            Ok(formatter.format_volume_outcome(&outcome))
        }
    }
}
