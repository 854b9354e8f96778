// src/exec/mod.rs

//! Task invocation layer.
//!
//! - [`task`] defines what a task is and the runner's default invocation
//!   entry point.
//! - [`intercept`] decorates an invocation entry point so every run is
//!   recorded in the [`BuildRunSession`](crate::session::BuildRunSession).
//! - [`command`] builds task bodies that run shell commands, either in this
//!   process or in a worker process.

pub mod command;
pub mod intercept;
pub mod task;

pub use command::{command_body, worker_body};
pub use intercept::track_failures;
pub use task::{
    Task, TaskBody, TaskFuture, TaskInvoker, TaskOutput, invoke_task, panic_message, settle,
};
