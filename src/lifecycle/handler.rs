// src/lifecycle/handler.rs

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{error, info, warn};

use crate::lifecycle::events::{
    DEFAULT_ERROR_EXIT_CODE, Disposition, ExitPhase, ProcessEvents, Subscription,
};
use crate::mode::BuildMode;
use crate::session::BuildRunSession;
use crate::state::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Running,
    /// Terminal: state has been (or is being) saved.
    Terminating,
}

/// Subscribes the build-state layer to a process's lifecycle events.
///
/// - interrupt: exit cleanly (code 0), no extra bookkeeping;
/// - uncaught error: mark the current task failed, then exit with code 1
///   unless `ignore_errors` is set;
/// - exit ([`ExitPhase::Persist`]): save the session snapshot, once;
/// - exit ([`ExitPhase::Finalize`], workers only): force a non-zero exit code
///   when the saved snapshot has failed tasks, so the parent sees them.
///
/// Dropping the handler unsubscribes all of it.
#[derive(Debug)]
pub struct LifecycleHandler {
    phase: Arc<Mutex<LifecyclePhase>>,
    subscriptions: Vec<Subscription>,
}

impl LifecycleHandler {
    pub fn install(
        events: &ProcessEvents,
        session: BuildRunSession,
        store: Arc<dyn StateStore>,
        mode: &BuildMode,
    ) -> Self {
        let phase = Arc::new(Mutex::new(LifecyclePhase::Running));
        let mut subscriptions = Vec::new();

        subscriptions.push(events.on_interrupt(|| {
            info!("interrupted; exiting");
            Disposition::Exit(0)
        }));

        {
            let session = session.clone();
            let ignore_errors = mode.ignore_errors;
            subscriptions.push(events.on_uncaught_error(move |err| {
                let task = session.mark_failed(None);
                error!(task = %task, error = %format!("{err:#}"), "uncaught error");
                if ignore_errors {
                    Disposition::Continue
                } else {
                    Disposition::Exit(DEFAULT_ERROR_EXIT_CODE)
                }
            }));
        }

        {
            let session = session.clone();
            let phase = Arc::clone(&phase);
            subscriptions.push(events.on_exit(ExitPhase::Persist, move |ctx| {
                {
                    let mut phase = phase.lock().unwrap_or_else(PoisonError::into_inner);
                    if *phase == LifecyclePhase::Terminating {
                        return Ok(());
                    }
                    *phase = LifecyclePhase::Terminating;
                }
                info!(reason = ?ctx.reason, code = ctx.code, "terminating; saving build state");
                store.save(&session.snapshot())
            }));
        }

        if mode.is_worker {
            subscriptions.push(events.on_exit(ExitPhase::Finalize, move |ctx| {
                let state = session.snapshot();
                if state.has_failures() {
                    warn!(failed = ?state.failed_tasks, "worker finished with failed tasks");
                    ctx.raise_code(DEFAULT_ERROR_EXIT_CODE);
                }
                Ok(())
            }));
        }

        Self {
            phase,
            subscriptions,
        }
    }

    pub fn phase(&self) -> LifecyclePhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Unsubscribe everything now.
    pub fn uninstall(self) {
        drop(self.subscriptions);
    }
}
