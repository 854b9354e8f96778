// src/exec/intercept.rs

//! Failure tracking around task invocation.

use std::sync::Arc;

use tracing::warn;

use crate::exec::task::{Task, TaskBody, TaskFuture, TaskInvoker, TaskOutput, settle};
use crate::session::BuildRunSession;
use crate::types::TaskName;

/// Wrap a task-invocation entry point so that every invocation is recorded
/// in `session`.
///
/// The returned invoker has the same signature as `run` and:
/// - begins the task in the session before its body runs;
/// - observes a deferred result and marks the task failed if it resolves to
///   an error (a panic inside it counts as one), handing the caller a
///   future with the same output;
/// - lets a synchronous `Err` from the body pass through untouched, leaving
///   attribution to the uncaught-error handler (the session's current task
///   is already set).
pub fn track_failures<R>(session: BuildRunSession, run: R) -> impl TaskInvoker
where
    R: TaskInvoker,
{
    move |task: &Task| {
        session.begin_task(&task.name);

        let Some(body) = task.body.clone() else {
            return run(task);
        };

        let observed = Task {
            name: task.name.clone(),
            body: Some(observe_body(session.clone(), task.name.clone(), body)),
        };
        run(&observed)
    }
}

fn observe_body(session: BuildRunSession, name: TaskName, body: TaskBody) -> TaskBody {
    Arc::new(move || match body()? {
        TaskOutput::Deferred(fut) => Ok(TaskOutput::Deferred(observe(
            session.clone(),
            name.clone(),
            fut,
        ))),
        TaskOutput::Done => Ok(TaskOutput::Done),
    })
}

fn observe(session: BuildRunSession, name: TaskName, fut: TaskFuture) -> TaskFuture {
    Box::pin(async move {
        let result = settle(fut).await;
        if let Err(err) = &result {
            warn!(task = %name, error = %err, "task failed asynchronously");
            session.mark_failed(Some(&name));
        }
        result
    })
}
