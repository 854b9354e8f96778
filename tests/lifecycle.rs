// tests/lifecycle.rs

use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use buildstate::fs::mock::MockFileSystem;
use buildstate::lifecycle::{
    DEFAULT_ERROR_EXIT_CODE, DEFAULT_INTERRUPT_EXIT_CODE, Disposition, ExitPhase, ExitReason,
    LifecycleHandler, LifecyclePhase, ProcessEvents,
};
use buildstate::mode::BuildMode;
use buildstate::session::BuildRunSession;
use buildstate::state::{BuildState, FileStateStore, MemoryStateStore, StateStore};
use buildstate::types::Env;
use buildstate_test_utils::init_tracing;

fn mode(ignore_errors: bool, is_worker: bool) -> BuildMode {
    BuildMode {
        env: Env::Dev,
        ignore_errors,
        is_worker,
        ..BuildMode::default()
    }
}

struct Fixture {
    events: ProcessEvents,
    session: BuildRunSession,
    store: Arc<MemoryStateStore>,
    handler: LifecycleHandler,
}

fn install(mode: BuildMode) -> Fixture {
    init_tracing();
    let events = ProcessEvents::new();
    let session = BuildRunSession::new(mode.env);
    let store = Arc::new(MemoryStateStore::new());
    let handler = LifecycleHandler::install(&events, session.clone(), store.clone(), &mode);
    Fixture {
        events,
        session,
        store,
        handler,
    }
}

#[test]
fn uncaught_error_marks_current_task_and_exits_by_default() {
    let fx = install(mode(false, false));
    fx.session.begin_task("compile");

    let disposition = fx.events.uncaught_error(&anyhow!("boom"));

    assert_eq!(disposition, Disposition::Exit(DEFAULT_ERROR_EXIT_CODE));
    assert!(fx.session.is_failed("compile"));
}

#[test]
fn uncaught_error_continues_when_ignoring_errors() {
    let fx = install(mode(true, false));
    fx.session.begin_task("x");

    let disposition = fx.events.uncaught_error(&anyhow!("boom"));

    assert_eq!(disposition, Disposition::Continue);
    assert!(fx.session.is_failed("x"));
}

#[test]
fn interrupt_exits_cleanly_without_marking_failures() {
    let fx = install(mode(false, false));
    fx.session.begin_task("watch");

    assert_eq!(fx.events.interrupt(), Disposition::Exit(0));
    assert!(!fx.session.is_failed("watch"));
}

#[test]
fn exit_saves_snapshot_once_and_enters_terminating() {
    let fx = install(mode(false, false));
    fx.session.begin_task("lint");
    fx.session.mark_failed(None);
    assert_eq!(fx.handler.phase(), LifecyclePhase::Running);

    let code = fx.events.exit(ExitReason::Completed, 0).unwrap();

    assert_eq!(code, 0, "the main process keeps the runner's code");
    assert_eq!(fx.handler.phase(), LifecyclePhase::Terminating);
    assert_eq!(
        fx.store.load(),
        Some(BuildState {
            env: Env::Dev,
            failed_tasks: vec!["lint".to_string()],
        })
    );

    // Later failures are not persisted by a second exit.
    fx.session.begin_task("late");
    fx.session.mark_failed(None);
    assert_eq!(fx.events.exit(ExitReason::Fatal, 1).unwrap(), 0);
    assert_eq!(fx.store.load().unwrap().failed_tasks, vec!["lint".to_string()]);
}

#[test]
fn worker_with_failed_tasks_exits_non_zero() {
    let fx = install(mode(true, true));
    fx.session.begin_task("build");
    fx.session.begin_task("lint");
    fx.session.mark_failed(Some("lint"));

    let code = fx.events.exit(ExitReason::Completed, 0).unwrap();

    assert_eq!(code, DEFAULT_ERROR_EXIT_CODE);
    assert_eq!(fx.store.load().unwrap().failed_tasks, vec!["lint".to_string()]);
}

#[test]
fn clean_worker_keeps_zero_exit_code() {
    let fx = install(mode(false, true));
    fx.session.begin_task("build");

    assert_eq!(fx.events.exit(ExitReason::Completed, 0).unwrap(), 0);
    assert_eq!(fx.store.load(), Some(BuildState::clean(Env::Dev)));
}

#[test]
fn worker_does_not_override_an_existing_failure_code() {
    let fx = install(mode(false, true));
    fx.session.begin_task("build");
    fx.session.mark_failed(None);

    assert_eq!(fx.events.exit(ExitReason::Fatal, 7).unwrap(), 7);
}

#[test]
fn save_runs_after_failures_recorded_during_the_same_exit() {
    let fx = install(mode(false, false));
    fx.session.begin_task("deploy");

    // Registered after the handler, but in an earlier phase.
    let session = fx.session.clone();
    let _late_record = fx.events.on_exit(ExitPhase::Record, move |_| {
        session.mark_failed(Some("deploy"));
        Ok(())
    });

    fx.events.exit(ExitReason::Completed, 0).unwrap();

    assert_eq!(fx.store.load().unwrap().failed_tasks, vec!["deploy".to_string()]);
}

#[test]
fn exit_hooks_run_in_phase_then_registration_order() {
    let events = ProcessEvents::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut subs = Vec::new();
    for (phase, label) in [
        (ExitPhase::Finalize, "finalize-1"),
        (ExitPhase::Persist, "persist-1"),
        (ExitPhase::Record, "record-1"),
        (ExitPhase::Persist, "persist-2"),
    ] {
        let order = Arc::clone(&order);
        subs.push(events.on_exit(phase, move |_| {
            order.lock().unwrap().push(label);
            Ok(())
        }));
    }

    events.exit(ExitReason::Completed, 0).unwrap();

    assert_eq!(
        *order.lock().unwrap(),
        vec!["record-1", "persist-1", "persist-2", "finalize-1"]
    );
}

#[test]
fn dropping_the_handler_unsubscribes_it() {
    let fx = install(mode(true, true));
    assert_eq!(fx.events.subscriber_count(), 4);

    let Fixture {
        events,
        session,
        store,
        handler,
    } = fx;
    handler.uninstall();
    assert_eq!(events.subscriber_count(), 0);

    session.begin_task("x");
    // Host defaults apply again.
    assert_eq!(
        events.uncaught_error(&anyhow!("boom")),
        Disposition::Exit(DEFAULT_ERROR_EXIT_CODE)
    );
    assert_eq!(events.interrupt(), Disposition::Exit(DEFAULT_INTERRUPT_EXIT_CODE));
    assert!(!session.is_failed("x"));

    events.exit(ExitReason::Completed, 0).unwrap();
    assert_eq!(store.load(), None);
}

#[test]
fn explicit_unsubscribe_removes_only_that_hook() {
    let events = ProcessEvents::new();
    let a = events.on_interrupt(|| Disposition::Continue);
    let _b = events.on_uncaught_error(|_| Disposition::Continue);
    assert_eq!(events.subscriber_count(), 2);

    a.unsubscribe();

    assert_eq!(events.subscriber_count(), 1);
    assert_eq!(events.interrupt(), Disposition::Exit(DEFAULT_INTERRUPT_EXIT_CODE));
}

#[test]
fn state_write_failure_surfaces_from_exit() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.set_read_only(true);
    let store: Arc<dyn StateStore> = Arc::new(FileStateStore::with_fs(fs, ".build-state"));

    let events = ProcessEvents::new();
    let session = BuildRunSession::new(Env::Dev);
    let _handler = LifecycleHandler::install(&events, session, store, &mode(false, false));

    let err = events.exit(ExitReason::Completed, 0).unwrap_err();

    assert!(format!("{err:#}").contains("saving build state"));
    assert_eq!(events.exit_code(), Some(DEFAULT_ERROR_EXIT_CODE));
}
