// src/gate.rs

//! Smart-build gate and related build-mode switches.
//!
//! Both operations edit the [`PropagatedArgs`] as well as the local
//! [`BuildMode`], so worker processes spawned afterwards inherit the same
//! decision.

use tracing::{debug, info};

use crate::args::{NO_PARALLEL_FLAG, PropagatedArgs, SMART_FLAG};
use crate::mode::BuildMode;
use crate::session::BuildRunSession;
use crate::state::{BuildState, StateStore};

/// Result of [`apply_smart_build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmartDecision {
    /// The previous build is trustworthy; smart build is on.
    Enabled,
    /// State changed since the previous build. `revoked` is true when the
    /// operator had asked for `--smart` and the request was withdrawn.
    Disabled { revoked: bool },
}

/// Whether anything casts doubt on artifacts from the previous build.
///
/// True when there is no previous state, the environment differs, or the
/// previous build ended with any failed task.
pub fn state_changed(previous: Option<&BuildState>, current: &BuildState) -> bool {
    match previous {
        None => true,
        Some(prev) => prev.env != current.env || prev.has_failures(),
    }
}

/// Decide whether this run may build incrementally.
///
/// Reads the store once. Must run before any task begins.
pub fn apply_smart_build(
    store: &dyn StateStore,
    session: &BuildRunSession,
    mode: &mut BuildMode,
    args: &mut PropagatedArgs,
) -> SmartDecision {
    let previous = store.load();
    let current = session.snapshot();

    if !state_changed(previous.as_ref(), &current) {
        mode.is_smart = true;
        args.push_flag(SMART_FLAG);
        info!(env = %current.env, "previous build clean; smart build enabled");
        return SmartDecision::Enabled;
    }

    debug!(?previous, ?current, "build state changed since previous run");

    let revoked = mode.smart_requested;
    if revoked {
        mode.is_smart = false;
        args.remove_flag(SMART_FLAG);
        info!("build state changed; ignoring --smart for this run");
    }
    SmartDecision::Disabled { revoked }
}

/// Turn off parallel workers for this process and anything it spawns.
pub fn disable_parallel(mode: &mut BuildMode, args: &mut PropagatedArgs) {
    mode.is_parallel = false;
    args.push_flag(NO_PARALLEL_FLAG);
    debug!("parallel build disabled");
}
