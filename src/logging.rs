// src/logging.rs

//! Logging setup for `querydag` using `tracing` + `tracing-subscriber`.
//!
//! The filter directive is resolved in this order:
//! 1. `--log-level` CLI flag, applied to `querydag` targets
//! 2. `QUERYDAG_LOG`: a bare level is applied to `querydag` targets, anything
//!    else is taken as a full `EnvFilter` directive
//!    (e.g. `querydag::engine=trace,querydag::dag=debug`)
//! 3. [`DEFAULT_DIRECTIVE`]
//!
//! Other crates stay at `warn` unless a full directive says otherwise.
//! Logs go to STDERR; stdout carries the statistics and exports.

use anyhow::{Context, Result};
use tracing::Level;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "QUERYDAG_LOG";

pub const DEFAULT_DIRECTIVE: &str = "warn,querydag=info";

/// Initialise the global logging subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV_VAR).ok();
    let directive = resolve_directive(cli_level, env.as_deref());
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("invalid log directive `{directive}` (from {LOG_ENV_VAR})"))?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))?;

    debug!(%directive, "logging initialised");
    Ok(())
}

/// Pick the filter directive from the CLI flag and the raw `QUERYDAG_LOG`
/// value. Blank env values count as unset.
pub fn resolve_directive(cli_level: Option<LogLevel>, env: Option<&str>) -> String {
    if let Some(lvl) = cli_level {
        return scoped(level_from_log_level(lvl));
    }

    match env.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => match parse_level_str(raw) {
            Some(level) => scoped(level),
            None => raw.to_string(),
        },
        None => DEFAULT_DIRECTIVE.to_string(),
    }
}

fn scoped(level: Level) -> String {
    format!("warn,querydag={}", level.as_str().to_ascii_lowercase())
}

fn level_from_log_level(lvl: LogLevel) -> Level {
    match lvl {
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    }
}

pub fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
