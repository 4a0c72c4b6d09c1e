// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `jobfan`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "jobfan",
    version,
    about = "Run a batch of scripts across local and HPC scheduler executors.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Jobfan.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Jobfan.toml")]
    pub config: String,

    /// Name of the executor to submit the scripts to.
    ///
    /// Required unless `--dry-run` is given.
    #[arg(short, long, value_name = "NAME")]
    pub executor: Option<String>,

    /// Scripts to run, one builder per script.
    #[arg(value_name = "SCRIPT")]
    pub scripts: Vec<String>,

    /// Account to charge batch jobs to (overrides executor settings).
    #[arg(long, value_name = "ACCOUNT")]
    pub account: Option<String>,

    /// Maximum time in seconds a batch job may sit in a queued state
    /// before it is cancelled (overrides executor settings).
    #[arg(long, value_name = "SECONDS")]
    pub max_pend_time: Option<u64>,

    /// Seconds between poll cycles for outstanding batch jobs.
    #[arg(long, value_name = "SECONDS")]
    pub poll_interval: Option<u64>,

    /// Number of worker tasks used for submission.
    ///
    /// Clamped to the number of available execution units on the host.
    #[arg(long, value_name = "N")]
    pub procs: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `JOBFAN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the executor table, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,
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
