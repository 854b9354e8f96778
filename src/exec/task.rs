// src/exec/task.rs

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use tokio::task::JoinHandle;

use crate::types::TaskName;

/// Work that finishes later. Resolves to `Err` when the task fails.
pub type TaskFuture = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

/// What a task body hands back when invoked.
pub enum TaskOutput {
    /// The task finished while being invoked.
    Done,
    /// The task continues in the background.
    Deferred(TaskFuture),
}

impl fmt::Debug for TaskOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutput::Done => f.write_str("Done"),
            TaskOutput::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// A task's function. Returning `Err` is a synchronous failure.
pub type TaskBody = Arc<dyn Fn() -> Result<TaskOutput> + Send + Sync>;

/// A named unit of build work.
#[derive(Clone)]
pub struct Task {
    pub name: TaskName,
    /// `None` for grouping tasks that only exist to pull in dependencies.
    pub body: Option<TaskBody>,
}

impl Task {
    pub fn new(name: impl Into<TaskName>, body: TaskBody) -> Self {
        Self {
            name: name.into(),
            body: Some(body),
        }
    }

    pub fn from_fn<F>(name: impl Into<TaskName>, f: F) -> Self
    where
        F: Fn() -> Result<TaskOutput> + Send + Sync + 'static,
    {
        Self::new(name, Arc::new(f))
    }

    pub fn pass_through(name: impl Into<TaskName>) -> Self {
        Self {
            name: name.into(),
            body: None,
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Anything with the signature of the runner's task-invocation entry point.
pub trait TaskInvoker: Fn(&Task) -> Result<TaskOutput> + Send + Sync {}

impl<T> TaskInvoker for T where T: Fn(&Task) -> Result<TaskOutput> + Send + Sync {}

/// The runner's undecorated entry point: call the body, if there is one.
pub fn invoke_task(task: &Task) -> Result<TaskOutput> {
    match &task.body {
        Some(body) => body(),
        None => Ok(TaskOutput::Done),
    }
}

/// Await a deferred result, turning a panic inside it into an `Err`.
///
/// The future runs as its own tokio task, which is aborted if the returned
/// future is dropped first.
pub async fn settle(fut: TaskFuture) -> Result<()> {
    let mut handle = AbortOnDrop(tokio::spawn(fut));
    match (&mut handle.0).await {
        Ok(result) => result,
        Err(err) if err.is_panic() => Err(anyhow!(
            "task panicked: {}",
            panic_message(&*err.into_panic())
        )),
        Err(err) => Err(anyhow!("task was cancelled: {err}")),
    }
}

struct AbortOnDrop(JoinHandle<Result<()>>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
