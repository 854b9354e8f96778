// src/engine/mod.rs

//! Build execution.
//!
//! - [`plan`] turns the task file into runnable [`Task`](crate::exec::Task)s
//!   for this process's role.
//! - [`runner`] executes a plan in dependency order, sequentially or with
//!   one worker process per task, routing synchronous task errors to the
//!   process's uncaught-error hooks.

pub mod plan;
pub mod runner;

pub use plan::{BuildPlan, ExecutionStrategy};
pub use runner::{RunReport, TaskRunner};
