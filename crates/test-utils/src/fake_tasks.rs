//! Task bodies with scripted outcomes.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use buildstate::exec::{Task, TaskOutput};

/// Shared log of task bodies in the order they were invoked.
#[derive(Debug, Clone, Default)]
pub struct InvocationLog {
    names: Arc<Mutex<Vec<String>>>,
}

impl InvocationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &str) {
        self.names.lock().unwrap().push(name.to_string());
    }

    pub fn names(&self) -> Vec<String> {
        self.names.lock().unwrap().clone()
    }
}

/// Scripted behaviour for a fake task body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// Finishes while being invoked.
    Sync,
    /// Returns `Err` while being invoked.
    SyncError,
    /// Defers, then succeeds after `ms` milliseconds.
    Async { ms: u64 },
    /// Defers, then fails after `ms` milliseconds.
    AsyncError { ms: u64 },
    /// Panics while being invoked.
    Panic,
    /// Defers, then panics after `ms` milliseconds.
    AsyncPanic { ms: u64 },
}

/// Build a task whose body follows `script` and records itself in `log`.
pub fn scripted(name: &str, script: Script, log: &InvocationLog) -> Task {
    let log = log.clone();
    let task_name = name.to_string();
    Task::from_fn(name, move || {
        log.record(&task_name);
        match script {
            Script::Sync => Ok(TaskOutput::Done),
            Script::SyncError => Err(anyhow!("{task_name} blew up")),
            Script::Async { ms } => Ok(TaskOutput::Deferred(Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(())
            }))),
            Script::AsyncError { ms } => {
                let task_name = task_name.clone();
                Ok(TaskOutput::Deferred(Box::pin(async move {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    Err(anyhow!("{task_name} failed later"))
                })))
            }
            Script::Panic => panic!("{task_name} panicked"),
            Script::AsyncPanic { ms } => Ok(TaskOutput::Deferred(Box::pin(panic_after(
                ms,
                format!("{task_name} panicked later"),
            )))),
        }
    })
}

async fn panic_after(ms: u64, msg: String) -> anyhow::Result<()> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    panic!("{msg}")
}
