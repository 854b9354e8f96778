// src/exec/command.rs

//! Task bodies backed by OS processes.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::info;

use crate::args::PropagatedArgs;
use crate::errors::BuildError;
use crate::exec::task::{TaskBody, TaskOutput};
use crate::types::TaskName;

/// Body that runs `cmd` through the platform shell in this process.
pub fn command_body(task: impl Into<TaskName>, cmd: impl Into<String>) -> TaskBody {
    let task = task.into();
    let cmd = cmd.into();
    Arc::new(move || {
        info!(task = %task, cmd = %cmd, "starting task process");
        spawn_deferred(task.clone(), shell_command(&cmd))
    })
}

/// Body that hands `task` to a worker process: `exe <args> --ll-worker -- <task>`.
///
/// The worker's exit status is the task's outcome.
pub fn worker_body(task: impl Into<TaskName>, exe: PathBuf, args: PropagatedArgs) -> TaskBody {
    let task = task.into();
    Arc::new(move || {
        let mut cmd = Command::new(&exe);
        cmd.args(args.worker_invocation(&task));
        info!(task = %task, exe = ?exe, args = ?args.as_slice(), "starting worker process");
        spawn_deferred(task.clone(), cmd)
    })
}

/// Build a shell command appropriate for the platform.
fn shell_command(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

/// Spawn now, wait later. A spawn failure is returned immediately.
fn spawn_deferred(task: TaskName, mut cmd: Command) -> Result<TaskOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for task '{}'", task))?;

    Ok(TaskOutput::Deferred(Box::pin(async move {
        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for process of task '{}'", task))?;

        let code = status.code().unwrap_or(-1);
        info!(task = %task, exit_code = code, success = status.success(), "task process exited");

        if status.success() {
            Ok(())
        } else {
            Err(BuildError::TaskFailed { task, code }.into())
        }
    })))
}
