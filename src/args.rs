// src/args.rs

//! The argument list handed down to worker processes.
//!
//! Workers are plain re-invocations of this binary, so the only way a build
//! mode decision made in the parent reaches them is by editing this list
//! before they are spawned.

use std::ffi::OsString;

pub const PRODUCTION_FLAG: &str = "--production";
pub const WATCH_FLAG: &str = "--watch";
pub const SMART_FLAG: &str = "--smart";
pub const NO_PARALLEL_FLAG: &str = "--no-ll";
pub const WORKER_FLAG: &str = "--ll-worker";
pub const SPEEDY_FLAG: &str = "--speedy";
pub const IGNORE_FLAG: &str = "--ignore";

/// Ordered list of command-line arguments inherited verbatim by workers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagatedArgs {
    args: Vec<String>,
}

impl PropagatedArgs {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Append a bare flag unless it is already present.
    pub fn push_flag(&mut self, flag: &str) {
        if !self.contains(flag) {
            self.args.push(flag.to_string());
        }
    }

    /// Append a `--name value` pair.
    pub fn push_value(&mut self, name: &str, value: &str) {
        self.args.push(name.to_string());
        self.args.push(value.to_string());
    }

    /// Remove every occurrence of a bare flag. Returns whether anything was
    /// removed.
    pub fn remove_flag(&mut self, flag: &str) -> bool {
        let before = self.args.len();
        self.args.retain(|a| a != flag);
        self.args.len() != before
    }

    pub fn contains(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.args
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Full argument vector for a worker that runs a single task.
    pub fn worker_invocation(&self, task: &str) -> Vec<OsString> {
        self.args
            .iter()
            .map(OsString::from)
            .chain([
                OsString::from(WORKER_FLAG),
                OsString::from("--"),
                OsString::from(task),
            ])
            .collect()
    }
}
