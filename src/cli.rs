// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! The flag names double as the worker protocol: a parallel build re-invokes
//! this binary for each task with the flags from [`CliArgs::propagated_args`].

use clap::{Parser, ValueEnum};

use crate::args::{
    IGNORE_FLAG, NO_PARALLEL_FLAG, PRODUCTION_FLAG, PropagatedArgs, SMART_FLAG, SPEEDY_FLAG,
    WATCH_FLAG,
};

/// Command-line arguments for `buildstate`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "buildstate",
    version,
    about = "Run build tasks in dependency order and remember how the last build ended.",
    long_about = None
)]
pub struct CliArgs {
    /// Tasks to run. Runs every task when empty.
    #[arg(value_name = "TASK")]
    pub tasks: Vec<String>,

    /// Path to the task file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Buildstate.toml")]
    pub config: String,

    /// Build for production instead of development.
    #[arg(long, visible_aliases = ["live", "release"])]
    pub production: bool,

    /// Watch mode: errors are recorded but never abort the process.
    #[arg(long)]
    pub watch: bool,

    /// Request an incremental build. Only honoured when the previous build
    /// ended cleanly in the same environment.
    #[arg(long)]
    pub smart: bool,

    /// Run tasks in this process instead of spawning worker processes.
    #[arg(long = "no-ll")]
    pub no_parallel: bool,

    /// Internal: this process is a worker spawned by a parallel build.
    #[arg(long = "ll-worker", hide = true)]
    pub worker: bool,

    /// Fast iterative build; implies `--ignore`.
    #[arg(long, visible_aliases = ["speed", "quick", "fast"])]
    pub speedy: bool,

    /// Keep going after uncaught task errors.
    #[arg(long)]
    pub ignore: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BUILDSTATE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the task order, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// The flag portion of this invocation, as inherited by worker processes.
    ///
    /// Positional task names, `--dry-run` and the worker flag itself are not
    /// part of it; the parallel runner appends those per worker.
    pub fn propagated_args(&self) -> PropagatedArgs {
        let mut args = PropagatedArgs::default();
        args.push_value("--config", &self.config);

        let switches = [
            (self.production, PRODUCTION_FLAG),
            (self.watch, WATCH_FLAG),
            (self.smart, SMART_FLAG),
            (self.no_parallel, NO_PARALLEL_FLAG),
            (self.speedy, SPEEDY_FLAG),
            (self.ignore, IGNORE_FLAG),
        ];
        for (enabled, flag) in switches {
            if enabled {
                args.push_flag(flag);
            }
        }

        if let Some(level) = self.log_level {
            args.push_value("--log-level", level.as_str());
        }

        args
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

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
