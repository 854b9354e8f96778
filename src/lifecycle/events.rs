// src/lifecycle/events.rs

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use anyhow::Result;
use tracing::{debug, error};

/// Exit code used when nobody handles an uncaught error.
pub const DEFAULT_ERROR_EXIT_CODE: i32 = 1;

/// Exit code used when nobody handles an interrupt.
pub const DEFAULT_INTERRUPT_EXIT_CODE: i32 = 130;

/// What the process should do after an uncaught error or an interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Continue,
    Exit(i32),
}

/// Ordering slot for exit hooks. Hooks run in phase order, then in the
/// order they subscribed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExitPhase {
    /// Last-chance failure recording.
    Record,
    /// Saving state. Sees everything recorded before it.
    Persist,
    /// Adjusting the exit code from saved state.
    Finalize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The run finished on its own.
    Completed,
    /// The operator interrupted the run.
    Interrupted,
    /// An uncaught error ended the run.
    Fatal,
}

/// Passed to every exit hook.
#[derive(Debug)]
pub struct ExitContext {
    pub reason: ExitReason,
    pub code: i32,
}

impl ExitContext {
    /// Make the exit code non-zero without overriding an existing failure code.
    pub fn raise_code(&mut self, code: i32) {
        if self.code == 0 {
            self.code = code;
        }
    }
}

type ExitHook = Arc<dyn Fn(&mut ExitContext) -> Result<()> + Send + Sync>;
type ErrorHook = Arc<dyn Fn(&anyhow::Error) -> Disposition + Send + Sync>;
type InterruptHook = Arc<dyn Fn() -> Disposition + Send + Sync>;

enum Hook {
    Exit(ExitPhase, ExitHook),
    Error(ErrorHook),
    Interrupt(InterruptHook),
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    hooks: Vec<(u64, Hook)>,
    exit_code: Option<i32>,
}

/// The lifecycle events a process exposes to its subscribers.
///
/// Hooks are called without the registry lock held. Clones share the same
/// registry.
#[derive(Clone, Default)]
pub struct ProcessEvents {
    registry: Arc<Mutex<Registry>>,
}

impl fmt::Debug for ProcessEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reg = self.lock();
        f.debug_struct("ProcessEvents")
            .field("subscribers", &reg.hooks.len())
            .field("exit_code", &reg.exit_code)
            .finish()
    }
}

impl ProcessEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_exit<F>(&self, phase: ExitPhase, hook: F) -> Subscription
    where
        F: Fn(&mut ExitContext) -> Result<()> + Send + Sync + 'static,
    {
        self.subscribe(Hook::Exit(phase, Arc::new(hook)))
    }

    pub fn on_uncaught_error<F>(&self, hook: F) -> Subscription
    where
        F: Fn(&anyhow::Error) -> Disposition + Send + Sync + 'static,
    {
        self.subscribe(Hook::Error(Arc::new(hook)))
    }

    pub fn on_interrupt<F>(&self, hook: F) -> Subscription
    where
        F: Fn() -> Disposition + Send + Sync + 'static,
    {
        self.subscribe(Hook::Interrupt(Arc::new(hook)))
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().hooks.len()
    }

    /// Exit code of the exit that already happened, if any.
    pub fn exit_code(&self) -> Option<i32> {
        self.lock().exit_code
    }

    /// Report an error nobody else handled.
    ///
    /// Every subscriber sees the error; the first `Exit` wins. Unhandled
    /// errors exit with [`DEFAULT_ERROR_EXIT_CODE`].
    pub fn uncaught_error(&self, err: &anyhow::Error) -> Disposition {
        let hooks: Vec<ErrorHook> = self
            .lock()
            .hooks
            .iter()
            .filter_map(|(_, hook)| match hook {
                Hook::Error(h) => Some(Arc::clone(h)),
                _ => None,
            })
            .collect();

        if hooks.is_empty() {
            error!(error = %format!("{err:#}"), "unhandled error");
            return Disposition::Exit(DEFAULT_ERROR_EXIT_CODE);
        }

        combine(hooks.iter().map(|hook| hook(err)))
    }

    /// Report an operator interrupt. Unhandled interrupts exit with
    /// [`DEFAULT_INTERRUPT_EXIT_CODE`].
    pub fn interrupt(&self) -> Disposition {
        let hooks: Vec<InterruptHook> = self
            .lock()
            .hooks
            .iter()
            .filter_map(|(_, hook)| match hook {
                Hook::Interrupt(h) => Some(Arc::clone(h)),
                _ => None,
            })
            .collect();

        if hooks.is_empty() {
            return Disposition::Exit(DEFAULT_INTERRUPT_EXIT_CODE);
        }

        combine(hooks.iter().map(|hook| hook()))
    }

    /// Run the exit hooks and return the final exit code.
    ///
    /// Happens at most once: later calls return the first exit's code
    /// without running anything. A failing hook stops the remaining hooks and
    /// its error is returned.
    pub fn exit(&self, reason: ExitReason, code: i32) -> Result<i32> {
        let mut hooks: Vec<(ExitPhase, ExitHook)> = {
            let mut reg = self.lock();
            if let Some(code) = reg.exit_code {
                debug!(code, "exit already ran");
                return Ok(code);
            }
            reg.exit_code = Some(code);
            reg.hooks
                .iter()
                .filter_map(|(_, hook)| match hook {
                    Hook::Exit(phase, h) => Some((*phase, Arc::clone(h))),
                    _ => None,
                })
                .collect()
        };
        // Stable: registration order is kept within a phase.
        hooks.sort_by_key(|(phase, _)| *phase);

        debug!(?reason, code, hooks = hooks.len(), "running exit hooks");

        let mut ctx = ExitContext { reason, code };
        let mut outcome = Ok(());
        for (_, hook) in hooks {
            if let Err(err) = hook(&mut ctx) {
                ctx.raise_code(DEFAULT_ERROR_EXIT_CODE);
                outcome = Err(err);
                break;
            }
        }

        self.lock().exit_code = Some(ctx.code);
        outcome.map(|()| ctx.code)
    }

    fn subscribe(&self, hook: Hook) -> Subscription {
        let mut reg = self.lock();
        let id = reg.next_id;
        reg.next_id += 1;
        reg.hooks.push((id, hook));
        Subscription {
            registry: Arc::downgrade(&self.registry),
            id,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn combine(dispositions: impl Iterator<Item = Disposition>) -> Disposition {
    // Collect first so every hook runs even after an `Exit`.
    let all: Vec<Disposition> = dispositions.collect();
    all.into_iter()
        .find(|d| matches!(d, Disposition::Exit(_)))
        .unwrap_or(Disposition::Continue)
}

/// Handle for one registered hook. Dropping it unsubscribes the hook.
#[must_use = "dropping a Subscription unsubscribes its hook"]
#[derive(Debug)]
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .hooks
                .retain(|(id, _)| *id != self.id);
        }
    }
}
