// src/logging.rs

//! Logging setup for `buildstate` using `tracing` + `tracing-subscriber`.
//!
//! The filter comes from, in order:
//! 1. `--log-level` (propagated to workers, so a parent's choice sticks)
//! 2. `BUILDSTATE_LOG`, read as an `EnvFilter` directive list
//!    (`debug`, `buildstate::lifecycle=trace,info`, ...)
//! 3. `info`, or `warn` inside a worker process
//!
//! Logs go to STDERR so stdout carries only task output.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::{CliArgs, LogLevel};

/// Environment variable consulted when no `--log-level` is given.
pub const LOG_ENV_VAR: &str = "BUILDSTATE_LOG";

/// Initialise the global subscriber. Call once at startup.
pub fn init_logging(args: &CliArgs) -> Result<()> {
    let filter = filter_for(args.log_level, args.worker);

    fmt()
        .with_env_filter(filter)
        .with_target(!args.worker)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))
}

/// Resolve the filter without installing anything.
///
/// Workers default to `warn`: the parent already reports each task's start
/// and outcome.
pub fn filter_for(cli_level: Option<LogLevel>, worker: bool) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(level.as_str());
    }
    EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(if worker { "warn" } else { "info" }))
}
