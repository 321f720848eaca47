// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Minimum interval between "currently running steps" log lines.
pub const MIN_RUNNING_DELAY_SECS: u64 = 60;

/// Command-line arguments for `jobctl`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "jobctl",
    version,
    about = "Run a job: a graph of dependent steps, with bounded concurrency.",
    long_about = None
)]
pub struct CliArgs {
    /// Job file (JSON, or TOML when the name ends in `.toml`).
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: String,

    /// Directory the job file is looked up in.
    #[arg(long, short = 'p', value_name = "DIR", default_value = ".")]
    pub path: PathBuf,

    /// Directory for step output and the job snapshot.
    #[arg(long, value_name = "DIR", default_value = "logs")]
    pub log_path: PathBuf,

    /// Seconds between controller loop iterations.
    #[arg(long, short = 'd', value_name = "SECS", default_value_t = 1.0)]
    pub delay: f64,

    /// Comma separated step ids to simulate instead of run.
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    pub disabled: Vec<String>,

    /// Replaces `mail_to` for this run.
    #[arg(long, short = 'e', value_name = "ADDR")]
    pub email: Option<String>,

    /// Extra variables as a JSON object; win over the job file.
    #[arg(long, short = 'x', value_name = "JSON")]
    pub extras: Option<String>,

    /// Read extra variables from a JSON file. `--extras` wins on conflicts.
    #[arg(long, value_name = "FILE")]
    pub extras_file: Option<PathBuf>,

    /// Seconds between "currently running steps" log lines (minimum 60).
    #[arg(
        long,
        value_name = "SECS",
        default_value_t = 900,
        value_parser = clap::value_parser!(u64).range(MIN_RUNNING_DELAY_SECS..)
    )]
    pub running_delay: u64,

    /// Simulate every step: nothing is executed, everything completes.
    #[arg(long)]
    pub simulate: bool,

    /// Do not send the summary mail when the job succeeds.
    #[arg(long)]
    pub no_success_email: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `JOBCTL_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the step table, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// Full path of the job file.
    pub fn config_path(&self) -> PathBuf {
        self.path.join(&self.config)
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
