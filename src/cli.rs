// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::ExportFormat;

/// Command-line arguments for `querydag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "querydag",
    version,
    about = "Run a decomposed plan of dependent sub-tasks as a concurrent DAG.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the plan file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Plan.toml")]
    pub plan: String,

    /// Parse + validate, print the graph, but don't execute any commands.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the final graph in this format after the run.
    #[arg(long, value_enum, value_name = "FORMAT")]
    pub export: Option<ExportFormat>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `QUERYDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Cancel the run after this many seconds; overrides
    /// `[config].run_timeout_secs`.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
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

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
