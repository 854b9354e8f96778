// src/lib.rs

pub mod args;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod gate;
pub mod lifecycle;
pub mod logging;
pub mod mode;
pub mod session;
pub mod state;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, config_root_dir, load_and_validate};
use crate::dag::DagGraph;
use crate::engine::{BuildPlan, ExecutionStrategy, RunReport, TaskRunner};
use crate::exec::{invoke_task, track_failures};
use crate::gate::{apply_smart_build, disable_parallel};
use crate::lifecycle::{Disposition, ExitReason, LifecycleHandler, ProcessEvents};
use crate::mode::BuildMode;
use crate::session::BuildRunSession;
use crate::state::{FileStateStore, StateStore};
use crate::types::TaskName;

enum RunEnd {
    Finished(errors::Result<RunReport>),
    Interrupted(i32),
}

/// High-level entry point used by `main.rs`. Returns the process exit code.
///
/// This wires together:
/// - task file loading and build mode resolution
/// - the build run session, state store and lifecycle hooks
/// - the smart-build gate
/// - the task runner, with every invocation tracked
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<i32> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    let mut mode = BuildMode::from_cli(&args);
    let mut propagated = args.propagated_args();
    let targets: Vec<TaskName> = args.tasks.clone();

    if args.dry_run {
        print_dry_run(&cfg, &mode, &targets)?;
        return Ok(0);
    }

    let session = BuildRunSession::new(mode.env);
    let state_path = config_root_dir(&config_path).join(&cfg.config.state_file);
    let store: Arc<dyn StateStore> = Arc::new(FileStateStore::new(state_path));

    let events = ProcessEvents::new();
    let _lifecycle =
        LifecycleHandler::install(&events, session.clone(), Arc::clone(&store), &mode);

    if mode.is_worker {
        disable_parallel(&mut mode, &mut propagated);
    }
    apply_smart_build(store.as_ref(), &session, &mut mode, &mut propagated);
    mode.log_summary(env!("CARGO_PKG_NAME"));

    let strategy = if mode.is_parallel {
        ExecutionStrategy::Workers {
            exe: std::env::current_exe().context("locating own executable for workers")?,
            args: propagated,
        }
    } else {
        ExecutionStrategy::InProcess
    };

    let plan = BuildPlan::from_config(&cfg, &strategy);
    let runner = TaskRunner::new(plan, track_failures(session.clone(), invoke_task), events.clone())
        .parallel(mode.is_parallel)
        .include_dependencies(!mode.is_worker);

    let ended = {
        let build = runner.run(&targets);
        tokio::pin!(build);
        let mut listen = true;

        loop {
            tokio::select! {
                result = &mut build => break RunEnd::Finished(result),
                signal = tokio::signal::ctrl_c(), if listen => match signal {
                    Ok(()) => {
                        if let Disposition::Exit(code) = events.interrupt() {
                            break RunEnd::Interrupted(code);
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to listen for Ctrl+C");
                        listen = false;
                    }
                },
            }
        }
    };

    let (reason, code) = match ended {
        RunEnd::Finished(Ok(report)) if report.aborted.is_some() => {
            (ExitReason::Fatal, report.exit_code(mode.ignore_errors))
        }
        RunEnd::Finished(Ok(report)) => {
            (ExitReason::Completed, report.exit_code(mode.ignore_errors))
        }
        RunEnd::Finished(Err(err)) => {
            events.exit(ExitReason::Fatal, 1)?;
            return Err(err.into());
        }
        RunEnd::Interrupted(code) => (ExitReason::Interrupted, code),
    };

    let code = events.exit(reason, code)?;
    info!(code, "exiting");
    Ok(code)
}

/// Print the resolved mode and the tasks that would run, in order.
fn print_dry_run(cfg: &ConfigFile, mode: &BuildMode, targets: &[TaskName]) -> Result<()> {
    let graph = DagGraph::from_config(cfg);
    let order = graph.topo_order(&graph.with_dependencies(targets)?)?;

    println!("buildstate dry-run");
    println!("  mode: {}", mode.labels().join(" | "));
    println!("  state_file: {}", cfg.config.state_file);
    println!();

    println!("tasks ({}):", order.len());
    for name in &order {
        println!("  - {name}");
        if let Some(task) = cfg.task.get(name) {
            match &task.cmd {
                _ if cfg.config.is_disabled(name) => println!("      (disabled)"),
                Some(cmd) => println!("      cmd: {cmd}"),
                None => println!("      (no command)"),
            }
            if !task.after.is_empty() {
                println!("      after: {:?}", task.after);
            }
        }
    }

    Ok(())
}
