// tests/runner_scenarios.rs

use std::sync::Arc;

use buildstate::dag::DagGraph;
use buildstate::engine::{BuildPlan, RunReport, TaskRunner};
use buildstate::exec::{Task, invoke_task, track_failures};
use buildstate::lifecycle::{ExitReason, LifecycleHandler, ProcessEvents};
use buildstate::mode::BuildMode;
use buildstate::session::BuildRunSession;
use buildstate::state::{BuildState, MemoryStateStore, StateStore};
use buildstate::types::Env;
use buildstate_test_utils::fake_tasks::{InvocationLog, Script, scripted};
use buildstate_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// One process worth of wiring: session, store, lifecycle, runner.
struct Harness {
    mode: BuildMode,
    events: ProcessEvents,
    session: BuildRunSession,
    store: Arc<MemoryStateStore>,
    _handler: LifecycleHandler,
}

impl Harness {
    fn new(mode: BuildMode) -> Self {
        init_tracing();
        let events = ProcessEvents::new();
        let session = BuildRunSession::new(mode.env);
        let store = Arc::new(MemoryStateStore::new());
        let handler = LifecycleHandler::install(&events, session.clone(), store.clone(), &mode);
        Self {
            mode,
            events,
            session,
            store,
            _handler: handler,
        }
    }

    fn runner(
        &self,
        deps: &[(&str, &[&str])],
        tasks: Vec<Task>,
    ) -> TaskRunner<impl buildstate::exec::TaskInvoker + use<>> {
        let graph = DagGraph::from_edges(deps.iter().map(|(name, after)| {
            (
                name.to_string(),
                after.iter().map(|s| s.to_string()).collect(),
            )
        }));
        TaskRunner::new(
            BuildPlan::new(graph, tasks),
            track_failures(self.session.clone(), invoke_task),
            self.events.clone(),
        )
        .parallel(self.mode.is_parallel && !self.mode.is_worker)
        .include_dependencies(!self.mode.is_worker)
    }

    /// What the binary does once the runner returns.
    fn shutdown(&self, report: &RunReport) -> i32 {
        let reason = if report.aborted.is_some() {
            ExitReason::Fatal
        } else {
            ExitReason::Completed
        };
        self.events
            .exit(reason, report.exit_code(self.mode.ignore_errors))
            .unwrap()
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn worker_with_async_failure_persists_it_and_exits_non_zero() -> TestResult {
    // Speedy workers ignore errors, so only the worker exit-code rule can
    // surface the failure to the parent.
    let h = Harness::new(BuildMode {
        env: Env::Dev,
        is_worker: true,
        is_speedy: true,
        ignore_errors: true,
        ..BuildMode::default()
    });
    let log = InvocationLog::new();
    let runner = h.runner(
        &[("build", &[]), ("lint", &[])],
        vec![
            scripted("build", Script::Async { ms: 1 }, &log),
            scripted("lint", Script::AsyncError { ms: 1 }, &log),
        ],
    );

    let report = with_timeout(runner.run(&names(&["build", "lint"]))).await?;
    assert_eq!(report.exit_code(true), 0);

    let code = h.shutdown(&report);

    assert_ne!(code, 0);
    assert_eq!(
        h.store.load(),
        Some(BuildState {
            env: Env::Dev,
            failed_tasks: names(&["lint"]),
        })
    );
    Ok(())
}

#[tokio::test]
async fn worker_runs_only_requested_tasks() -> TestResult {
    let h = Harness::new(BuildMode {
        is_worker: true,
        ..BuildMode::default()
    });
    let log = InvocationLog::new();
    let runner = h.runner(
        &[("compile", &[]), ("test", &["compile"])],
        vec![
            scripted("compile", Script::Sync, &log),
            scripted("test", Script::Sync, &log),
        ],
    );

    let report = runner.run(&names(&["test"])).await?;

    assert_eq!(log.names(), names(&["test"]));
    assert_eq!(report.succeeded, names(&["test"]));
    Ok(())
}

#[tokio::test]
async fn ignore_errors_keeps_running_after_uncaught_error() -> TestResult {
    let h = Harness::new(BuildMode {
        ignore_errors: true,
        ..BuildMode::default()
    });
    let log = InvocationLog::new();
    let runner = h.runner(
        &[("x", &[]), ("y", &[]), ("z", &[])],
        vec![
            scripted("x", Script::SyncError, &log),
            scripted("y", Script::Sync, &log),
            scripted("z", Script::Async { ms: 1 }, &log),
        ],
    );

    let report = runner.run(&[]).await?;

    assert_eq!(log.names(), names(&["x", "y", "z"]));
    assert_eq!(report.failed, names(&["x"]));
    assert_eq!(report.succeeded, names(&["y", "z"]));
    assert_eq!(report.aborted, None);
    assert!(h.session.is_failed("x"));

    assert_eq!(h.shutdown(&report), 0);
    assert_eq!(h.store.load().unwrap().failed_tasks, names(&["x"]));
    Ok(())
}

#[tokio::test]
async fn uncaught_error_stops_the_build_without_ignore_errors() -> TestResult {
    let h = Harness::new(BuildMode::default());
    let log = InvocationLog::new();
    let runner = h.runner(
        &[("x", &[]), ("y", &[])],
        vec![
            scripted("x", Script::SyncError, &log),
            scripted("y", Script::Sync, &log),
        ],
    );

    let report = runner.run(&[]).await?;

    assert_eq!(log.names(), names(&["x"]));
    assert_eq!(report.aborted, Some(1));
    assert_eq!(h.shutdown(&report), 1);
    assert_eq!(h.store.load().unwrap().failed_tasks, names(&["x"]));
    Ok(())
}

#[tokio::test]
async fn failed_dependency_skips_dependents_but_not_siblings() -> TestResult {
    let h = Harness::new(BuildMode::default());
    let log = InvocationLog::new();
    let runner = h.runner(
        &[("lint", &[]), ("docs", &[]), ("build", &["lint"]), ("all", &["build", "docs"])],
        vec![
            scripted("lint", Script::AsyncError { ms: 1 }, &log),
            scripted("docs", Script::Sync, &log),
            scripted("build", Script::Sync, &log),
            Task::pass_through("all"),
        ],
    );

    let report = runner.run(&names(&["all"])).await?;

    assert_eq!(log.names(), names(&["docs", "lint"]));
    assert_eq!(report.failed, names(&["lint"]));
    assert_eq!(report.skipped, names(&["build", "all"]));
    assert_eq!(h.shutdown(&report), 1);
    assert_eq!(h.store.load().unwrap().failed_tasks, names(&["lint"]));
    Ok(())
}

#[tokio::test]
async fn requested_task_pulls_in_dependencies_in_order() -> TestResult {
    let h = Harness::new(BuildMode::default());
    let log = InvocationLog::new();
    let runner = h.runner(
        &[("b", &["c"]), ("c", &[]), ("a", &["b"]), ("other", &[])],
        vec![
            scripted("a", Script::Sync, &log),
            scripted("b", Script::Async { ms: 1 }, &log),
            scripted("c", Script::Sync, &log),
            scripted("other", Script::Sync, &log),
        ],
    );

    assert_eq!(runner.execution_order(&names(&["a"]))?, names(&["c", "b", "a"]));

    let report = runner.run(&names(&["a"])).await?;

    assert_eq!(log.names(), names(&["c", "b", "a"]));
    assert!(report.is_success());
    assert_eq!(h.shutdown(&report), 0);
    assert_eq!(h.store.load(), Some(BuildState::clean(Env::Dev)));
    Ok(())
}

#[tokio::test]
async fn unknown_task_is_an_error() {
    let h = Harness::new(BuildMode::default());
    let runner = h.runner(&[("a", &[])], vec![Task::pass_through("a")]);

    let err = runner.run(&names(&["nope"])).await.unwrap_err();

    assert!(err.to_string().contains("nope"));
}

#[tokio::test]
async fn parallel_runner_starts_ready_tasks_together() -> TestResult {
    let h = Harness::new(BuildMode {
        is_parallel: true,
        ..BuildMode::default()
    });
    let log = InvocationLog::new();
    let runner = h.runner(
        &[("slow", &[]), ("quick", &[]), ("pack", &["quick", "slow"])],
        vec![
            scripted("slow", Script::Async { ms: 80 }, &log),
            scripted("quick", Script::Async { ms: 5 }, &log),
            scripted("pack", Script::Sync, &log),
        ],
    );

    let report = with_timeout(runner.run(&[])).await?;

    assert_eq!(log.names(), names(&["quick", "slow", "pack"]));
    assert_eq!(report.succeeded, names(&["quick", "slow", "pack"]));
    Ok(())
}

#[tokio::test]
async fn parallel_async_failure_does_not_stop_independent_tasks() -> TestResult {
    let h = Harness::new(BuildMode {
        is_parallel: true,
        ..BuildMode::default()
    });
    let log = InvocationLog::new();
    let runner = h.runner(
        &[("lint", &[]), ("build", &[]), ("ship", &["lint", "build"])],
        vec![
            scripted("lint", Script::AsyncError { ms: 1 }, &log),
            scripted("build", Script::Async { ms: 30 }, &log),
            scripted("ship", Script::Sync, &log),
        ],
    );

    let report = with_timeout(runner.run(&[])).await?;

    assert_eq!(report.failed, names(&["lint"]));
    assert_eq!(report.succeeded, names(&["build"]));
    assert_eq!(report.skipped, names(&["ship"]));
    assert_eq!(h.session.snapshot().failed_tasks, names(&["lint"]));
    Ok(())
}

#[tokio::test]
async fn parallel_uncaught_error_aborts_running_tasks() -> TestResult {
    let h = Harness::new(BuildMode {
        is_parallel: true,
        ..BuildMode::default()
    });
    let log = InvocationLog::new();
    let runner = h.runner(
        &[("a", &[]), ("b", &[])],
        vec![
            scripted("a", Script::Async { ms: 5_000 }, &log),
            scripted("b", Script::SyncError, &log),
        ],
    );

    let report = with_timeout(runner.run(&[])).await?;

    assert_eq!(report.aborted, Some(1));
    assert!(report.succeeded.is_empty());
    assert_eq!(h.shutdown(&report), 1);
    assert_eq!(h.store.load().unwrap().failed_tasks, names(&["b"]));
    Ok(())
}

#[tokio::test]
async fn panicking_task_is_marked_failed_and_state_is_saved() -> TestResult {
    let h = Harness::new(BuildMode::default());
    let log = InvocationLog::new();
    let runner = h.runner(
        &[("x", &[]), ("y", &["x"])],
        vec![
            scripted("x", Script::Panic, &log),
            scripted("y", Script::Sync, &log),
        ],
    );

    let report = with_timeout(runner.run(&[])).await?;

    assert_eq!(report.aborted, Some(1));
    assert_eq!(report.failed, names(&["x"]));
    assert!(h.session.is_failed("x"));
    assert_eq!(log.names(), names(&["x"]));

    assert_eq!(h.shutdown(&report), 1);
    assert_eq!(h.events.exit_code(), Some(1));
    assert_eq!(
        h.store.load(),
        Some(BuildState {
            env: Env::Dev,
            failed_tasks: names(&["x"]),
        })
    );
    Ok(())
}

#[tokio::test]
async fn panicking_task_under_ignore_errors_lets_the_run_continue() -> TestResult {
    let h = Harness::new(BuildMode {
        ignore_errors: true,
        ..BuildMode::default()
    });
    let log = InvocationLog::new();
    let runner = h.runner(
        &[("x", &[]), ("y", &[])],
        vec![
            scripted("x", Script::Panic, &log),
            scripted("y", Script::Sync, &log),
        ],
    );

    let report = with_timeout(runner.run(&[])).await?;

    assert_eq!(report.aborted, None);
    assert_eq!(report.failed, names(&["x"]));
    assert_eq!(report.succeeded, names(&["y"]));
    assert_eq!(h.shutdown(&report), 0);
    assert_eq!(h.store.load().unwrap().failed_tasks, names(&["x"]));
    Ok(())
}

#[tokio::test]
async fn deferred_panic_fails_the_task_in_both_modes() -> TestResult {
    for parallel in [false, true] {
        let h = Harness::new(BuildMode {
            is_parallel: parallel,
            ..BuildMode::default()
        });
        let log = InvocationLog::new();
        let runner = h.runner(
            &[("lint", &[]), ("docs", &[]), ("build", &["lint"])],
            vec![
                scripted("lint", Script::AsyncPanic { ms: 1 }, &log),
                scripted("docs", Script::Async { ms: 5 }, &log),
                scripted("build", Script::Sync, &log),
            ],
        );

        let report = with_timeout(runner.run(&[])).await?;

        assert_eq!(report.aborted, None, "parallel={parallel}");
        assert_eq!(report.failed, names(&["lint"]), "parallel={parallel}");
        assert_eq!(report.succeeded, names(&["docs"]), "parallel={parallel}");
        assert_eq!(report.skipped, names(&["build"]), "parallel={parallel}");
        assert!(h.session.is_failed("lint"), "parallel={parallel}");

        assert_eq!(h.shutdown(&report), 1);
        assert_eq!(h.store.load().unwrap().failed_tasks, names(&["lint"]));
    }
    Ok(())
}
