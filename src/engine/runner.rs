// src/engine/runner.rs

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use anyhow::{Result as AnyResult, anyhow};
use tokio::task::{self, JoinSet};
use tracing::{debug, info, warn};

use crate::dag::DagGraph;
use crate::engine::plan::BuildPlan;
use crate::errors::{BuildError, Result};
use crate::exec::{TaskFuture, TaskInvoker, TaskOutput, panic_message, settle};
use crate::lifecycle::{Disposition, ProcessEvents};
use crate::types::TaskName;

/// What happened to each selected task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Tasks that finished successfully, in completion order.
    pub succeeded: Vec<TaskName>,
    /// Tasks that failed, in completion order.
    pub failed: Vec<TaskName>,
    /// Tasks never begun because a dependency failed or was skipped.
    pub skipped: Vec<TaskName>,
    /// Set when an uncaught error stopped the run early, with the exit code
    /// it asked for.
    pub aborted: Option<i32>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty() && self.aborted.is_none()
    }

    /// Exit code the runner itself would report for this run.
    pub fn exit_code(&self, ignore_errors: bool) -> i32 {
        match self.aborted {
            Some(code) => code,
            None if !ignore_errors && !self.is_success() => 1,
            None => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

/// Runs a [`BuildPlan`] in dependency order through a task invoker.
///
/// Every task goes through `invoke`, normally the plan's entry point wrapped
/// with [`track_failures`](crate::exec::track_failures). An `Err` returned by
/// `invoke` is reported to `events` as an uncaught error; if that asks for an
/// exit the run stops at once. A panicking task counts as an error: raised
/// while invoking, it is reported the same way; raised inside a deferred
/// result, it fails that task.
pub struct TaskRunner<I: TaskInvoker> {
    plan: BuildPlan,
    invoke: I,
    events: ProcessEvents,
    parallel: bool,
    include_dependencies: bool,
}

impl<I: TaskInvoker> fmt::Debug for TaskRunner<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRunner")
            .field("plan", &self.plan)
            .field("parallel", &self.parallel)
            .field("include_dependencies", &self.include_dependencies)
            .finish_non_exhaustive()
    }
}

impl<I: TaskInvoker> TaskRunner<I> {
    /// Sequential runner that pulls in dependencies of requested tasks.
    pub fn new(plan: BuildPlan, invoke: I, events: ProcessEvents) -> Self {
        Self {
            plan,
            invoke,
            events,
            parallel: false,
            include_dependencies: true,
        }
    }

    /// Start every ready task at once instead of one at a time.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// When false, only the requested tasks run (worker processes).
    pub fn include_dependencies(mut self, include: bool) -> Self {
        self.include_dependencies = include;
        self
    }

    /// Tasks that `run(targets)` would execute, in dependency order.
    pub fn execution_order(&self, targets: &[TaskName]) -> Result<Vec<TaskName>> {
        let selected = self.select(targets)?;
        self.plan.graph().topo_order(&selected)
    }

    pub async fn run(&self, targets: &[TaskName]) -> Result<RunReport> {
        let order = self.execution_order(targets)?;
        info!(tasks = ?order, parallel = self.parallel, "starting build");

        let report = if self.parallel {
            self.run_parallel(&order).await?
        } else {
            self.run_sequential(&order).await?
        };

        info!(
            succeeded = report.succeeded.len(),
            failed = ?report.failed,
            skipped = ?report.skipped,
            aborted = ?report.aborted,
            "build finished"
        );
        Ok(report)
    }

    fn select(&self, targets: &[TaskName]) -> Result<BTreeSet<TaskName>> {
        let graph = self.plan.graph();
        if self.include_dependencies || targets.is_empty() {
            return graph.with_dependencies(targets);
        }
        targets
            .iter()
            .map(|t| {
                if graph.contains(t) {
                    Ok(t.clone())
                } else {
                    Err(BuildError::TaskNotFound(t.clone()))
                }
            })
            .collect()
    }

    async fn run_sequential(&self, order: &[TaskName]) -> Result<RunReport> {
        let graph = self.plan.graph();
        let mut status: HashMap<TaskName, TaskStatus> = order
            .iter()
            .map(|n| (n.clone(), TaskStatus::Pending))
            .collect();
        let mut report = RunReport::default();

        for name in order {
            if blocked(graph, &status, name) {
                skip(&mut status, &mut report, name);
                continue;
            }

            let outcome = match self.start(name, &mut report)? {
                Started::Aborted => return Ok(report),
                Started::Finished(result) => result,
                Started::Deferred(fut) => settle(fut).await,
            };
            finish(&mut status, &mut report, name, outcome);
        }

        Ok(report)
    }

    async fn run_parallel(&self, order: &[TaskName]) -> Result<RunReport> {
        let graph = self.plan.graph();
        let mut status: HashMap<TaskName, TaskStatus> = order
            .iter()
            .map(|n| (n.clone(), TaskStatus::Pending))
            .collect();
        let mut report = RunReport::default();
        let mut running: JoinSet<AnyResult<()>> = JoinSet::new();
        let mut running_names: HashMap<task::Id, TaskName> = HashMap::new();

        loop {
            let mut progressed = true;
            while progressed {
                progressed = false;
                for name in order {
                    if status.get(name) != Some(&TaskStatus::Pending) {
                        continue;
                    }
                    if blocked(graph, &status, name) {
                        skip(&mut status, &mut report, name);
                        progressed = true;
                        continue;
                    }
                    if !ready(graph, &status, name) {
                        continue;
                    }

                    match self.start(name, &mut report)? {
                        Started::Aborted => {
                            running.abort_all();
                            return Ok(report);
                        }
                        Started::Finished(result) => {
                            finish(&mut status, &mut report, name, result);
                            progressed = true;
                        }
                        Started::Deferred(fut) => {
                            status.insert(name.clone(), TaskStatus::Running);
                            let handle = running.spawn(fut);
                            running_names.insert(handle.id(), name.clone());
                        }
                    }
                }
            }

            let (id, result) = match running.join_next_with_id().await {
                None => break,
                Some(Ok((id, result))) => (id, result),
                Some(Err(err)) => {
                    let id = err.id();
                    let result = if err.is_panic() {
                        Err(anyhow!("task panicked: {}", panic_message(&*err.into_panic())))
                    } else {
                        Err(anyhow!("task was cancelled: {err}"))
                    };
                    (id, result)
                }
            };
            match running_names.remove(&id) {
                Some(name) => finish(&mut status, &mut report, &name, result),
                None => warn!(?id, "completed task future has no name"),
            }
        }

        Ok(report)
    }

    /// Invoke one task and route a synchronous error to the uncaught-error
    /// hooks.
    fn start(&self, name: &str, report: &mut RunReport) -> Result<Started> {
        let task = self
            .plan
            .task(name)
            .ok_or_else(|| BuildError::TaskNotFound(name.to_string()))?;

        debug!(task = %name, "invoking task");
        let invoked = catch_unwind(AssertUnwindSafe(|| (self.invoke)(task))).unwrap_or_else(
            |payload| Err(anyhow!("task '{name}' panicked: {}", panic_message(&*payload))),
        );
        match invoked {
            Ok(TaskOutput::Done) => Ok(Started::Finished(Ok(()))),
            Ok(TaskOutput::Deferred(fut)) => Ok(Started::Deferred(fut)),
            Err(err) => match self.events.uncaught_error(&err) {
                Disposition::Exit(code) => {
                    warn!(task = %name, code, "uncaught error; stopping build");
                    report.failed.push(name.to_string());
                    report.aborted = Some(code);
                    Ok(Started::Aborted)
                }
                Disposition::Continue => Ok(Started::Finished(Err(err))),
            },
        }
    }
}

enum Started {
    Finished(AnyResult<()>),
    Deferred(TaskFuture),
    Aborted,
}

/// A dependency inside this run failed or was skipped.
fn blocked(graph: &DagGraph, status: &HashMap<TaskName, TaskStatus>, name: &str) -> bool {
    graph.dependencies_of(name).iter().any(|dep| {
        matches!(
            status.get(dep),
            Some(TaskStatus::Failed) | Some(TaskStatus::Skipped)
        )
    })
}

/// Every dependency inside this run has succeeded. Dependencies outside the
/// run count as satisfied.
fn ready(graph: &DagGraph, status: &HashMap<TaskName, TaskStatus>, name: &str) -> bool {
    graph
        .dependencies_of(name)
        .iter()
        .all(|dep| matches!(status.get(dep), None | Some(TaskStatus::Succeeded)))
}

fn skip(status: &mut HashMap<TaskName, TaskStatus>, report: &mut RunReport, name: &str) {
    info!(task = %name, "skipping task; a dependency did not succeed");
    status.insert(name.to_string(), TaskStatus::Skipped);
    report.skipped.push(name.to_string());
}

fn finish(
    status: &mut HashMap<TaskName, TaskStatus>,
    report: &mut RunReport,
    name: &str,
    result: AnyResult<()>,
) {
    match result {
        Ok(()) => {
            status.insert(name.to_string(), TaskStatus::Succeeded);
            report.succeeded.push(name.to_string());
        }
        Err(err) => {
            warn!(task = %name, error = %format!("{err:#}"), "task failed");
            status.insert(name.to_string(), TaskStatus::Failed);
            report.failed.push(name.to_string());
        }
    }
}
