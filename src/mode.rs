// src/mode.rs

//! Resolved build mode for the current process.

use tracing::info;

use crate::cli::CliArgs;
use crate::types::Env;

/// Flags that steer how this process builds and how it treats failures.
///
/// Resolved once from the command line. The smart-build gate and the
/// disable-parallel operation are the only code that changes it afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildMode {
    pub env: Env,
    pub is_watching: bool,
    pub is_parallel: bool,
    pub is_smart: bool,
    /// The operator asked for `--smart` explicitly.
    pub smart_requested: bool,
    pub is_worker: bool,
    pub is_speedy: bool,
    pub ignore_errors: bool,
}

impl BuildMode {
    pub fn from_cli(args: &CliArgs) -> Self {
        let env = if args.production {
            Env::Production
        } else {
            Env::Dev
        };
        let is_watching = args.watch || args.tasks.iter().any(|t| t.contains("watch"));
        let is_speedy = args.speedy;

        Self {
            env,
            is_watching,
            is_parallel: !args.no_parallel,
            is_smart: args.smart,
            smart_requested: args.smart,
            is_worker: args.worker,
            is_speedy,
            ignore_errors: args.ignore || is_watching || is_speedy,
        }
    }

    /// Labels for every active flag, environment first.
    pub fn labels(&self) -> Vec<&'static str> {
        let mut labels = vec![self.env.as_str()];
        let flags = [
            (self.is_watching, "WATCHING"),
            (self.is_parallel, "PARALLEL BUILD"),
            (self.is_smart, "SMART BUILD"),
            (self.is_speedy, "SPEEDY BUILD"),
            (self.ignore_errors, "IGNORE ERRORS"),
        ];
        labels.extend(flags.iter().filter(|(on, _)| *on).map(|(_, l)| *l));
        labels
    }

    /// Log a one-line summary of the resolved mode.
    pub fn log_summary(&self, project: &str) {
        let mut parts = vec![project];
        parts.extend(self.labels());
        info!(worker = self.is_worker, "{}", parts.join(" | "));
    }
}
