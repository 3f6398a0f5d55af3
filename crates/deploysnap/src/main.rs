//! deploysnap - snapshot a project directory around a deployment.
//!
//! Meant to be called by a deployment pipeline: it never prompts and never
//! reads stdin. Results go to stdout, logs to stderr.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use deploysnap_snapshot::SnapshotConfig;
use deploysnap_util::{log, LogConfig, LogLevel};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "deploysnap")]
#[command(author, version, about = "Git-backed snapshots of deployment directories", long_about = None)]
struct Cli {
    /// Project directory to snapshot
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log level (trace, debug, info, warn, error); overrides --verbose
    #[arg(long, global = true, value_parser = parse_log_level)]
    log_level: Option<LogLevel>,

    /// Also append logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Also append logs to the platform log directory
    #[arg(long, global = true, conflicts_with = "log_file")]
    persist_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a snapshot store exists at or above the project
    Check,
    /// Create the snapshot store with a baseline snapshot if it is missing
    Init,
    /// Commit everything currently in the project, ignored files included
    Capture,
    /// List files changed since the last snapshot
    Changes {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List snapshots, newest first
    History {
        /// Maximum number of snapshots to list
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
        /// Print the history as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_log_level(s: &str) -> Result<LogLevel, String> {
    LogLevel::parse(s).ok_or_else(|| format!("unknown log level '{s}'"))
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let log_file = if cli.persist_logs {
        log::default_log_path()
    } else {
        cli.log_file.clone()
    };
    let opened_log = log::init(&LogConfig {
        print: true,
        level: cli.log_level.unwrap_or(if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        }),
        include_location: cli.verbose,
        file: log_file,
    });
    if let Some(path) = opened_log {
        tracing::debug!(path = %path.display(), "Logging to file");
    }

    let config = match &cli.config {
        Some(path) => SnapshotConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SnapshotConfig::default(),
    };
    let project = cli
        .project
        .canonicalize()
        .with_context(|| format!("Project directory {} not found", cli.project.display()))?;

    match cli.command {
        Commands::Check => Ok(commands::check(&project, config)),
        Commands::Init => Ok(commands::init(&project, config)),
        Commands::Capture => Ok(commands::capture(&project, config)),
        Commands::Changes { json } => commands::changes(&project, config, json),
        Commands::History { limit, json } => commands::history(&project, config, limit, json),
    }
}
