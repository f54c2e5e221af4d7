// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{debug, info, warn};

use crate::build::{
    BuildStep, CycleOutcome, CycleSummary, ScheduledStep, Scheduler, StepOutcome, StepSet,
};
use crate::engine::pending::PendingCycle;
use crate::engine::{RuntimeOptions, TriggerReason};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Send these steps to the executor.
    DispatchSteps(Vec<ScheduledStep>),
    /// A cycle finished; report it.
    CycleFinished(CycleSummary),
    /// Start the dev server (once, after the first cycle).
    StartServer,
    /// Stop the process. `success` decides the exit status.
    RequestExit { success: bool },
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub(crate) fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Mutable core state the handlers operate on.
#[derive(Debug)]
pub(crate) struct CoreState<'a> {
    pub scheduler: &'a mut Scheduler,
    pub pending: &'a mut PendingCycle,
    pub options: &'a RuntimeOptions,
    pub server_started: &'a mut bool,
    pub cycles_completed: &'a mut u64,
}

/// Handle a cycle request.
///
/// - Idle: start a cycle with these steps (plus anything pending).
/// - Busy: fold them into the pending cycle.
pub(crate) fn handle_cycle_request(
    state: &mut CoreState<'_>,
    steps: StepSet,
    reason: TriggerReason,
) -> CoreStep {
    if steps.is_empty() {
        debug!(?reason, "empty cycle request; ignoring");
        return CoreStep::running(Vec::new());
    }

    if !state.scheduler.is_idle() {
        info!(?reason, steps = %steps, "cycle running; request queued");
        state.pending.record(&steps);
        return CoreStep::running(Vec::new());
    }

    let mut all = state.pending.take();
    all.merge(&steps);
    info!(?reason, steps = %all, "cycle requested");
    start_cycle(state, all)
}

/// Handle completion of a dispatched step.
pub(crate) fn handle_step_completion(
    state: &mut CoreState<'_>,
    step: BuildStep,
    cycle_id: u64,
    outcome: StepOutcome,
) -> CoreStep {
    let result = state.scheduler.handle_completion(step, cycle_id, outcome);

    let mut commands = Vec::new();
    if !result.newly_scheduled.is_empty() {
        commands.push(CoreCommand::DispatchSteps(result.newly_scheduled));
    }

    match result.cycle_finished {
        Some(summary) => {
            let mut next = finish_cycle(state, summary);
            commands.append(&mut next.commands);
            CoreStep {
                commands,
                keep_running: next.keep_running,
            }
        }
        None => CoreStep::running(commands),
    }
}

/// Handle Ctrl-C.
///
/// A one-shot command interrupted before its cycle finished must not report
/// success; long-running commands just stop.
pub(crate) fn handle_shutdown(state: &mut CoreState<'_>) -> CoreStep {
    let mut commands = Vec::new();
    let unfinished = !state.scheduler.is_idle() || !state.pending.is_empty();
    if state.options.exit_when_idle && unfinished {
        warn!("interrupted before the cycle finished");
        commands.push(CoreCommand::RequestExit { success: false });
    } else {
        info!("shutdown requested");
    }
    CoreStep {
        commands,
        keep_running: false,
    }
}

fn start_cycle(state: &mut CoreState<'_>, steps: StepSet) -> CoreStep {
    let result = state.scheduler.start_cycle(steps);

    let mut commands = Vec::new();
    if !result.newly_scheduled.is_empty() {
        commands.push(CoreCommand::DispatchSteps(result.newly_scheduled));
    }

    match result.cycle_finished {
        Some(summary) => {
            let mut next = finish_cycle(state, summary);
            commands.append(&mut next.commands);
            CoreStep {
                commands,
                keep_running: next.keep_running,
            }
        }
        None => CoreStep::running(commands),
    }
}

/// Report the cycle, start the server after the first one, then either run
/// the pending cycle or (one-shot) exit.
fn finish_cycle(state: &mut CoreState<'_>, summary: CycleSummary) -> CoreStep {
    *state.cycles_completed += 1;
    let success = summary.outcome == CycleOutcome::Success;
    if !success {
        warn!(cycle_id = summary.cycle_id, outcome = ?summary.outcome, "cycle did not fully succeed");
    }

    let mut commands = vec![CoreCommand::CycleFinished(summary)];

    if state.options.start_server && !*state.server_started {
        *state.server_started = true;
        commands.push(CoreCommand::StartServer);
    }

    if !state.pending.is_empty() {
        let steps = state.pending.take();
        let mut next = start_cycle(state, steps);
        commands.append(&mut next.commands);
        return CoreStep {
            commands,
            keep_running: next.keep_running,
        };
    }

    if state.options.exit_when_idle {
        commands.push(CoreCommand::RequestExit { success });
        return CoreStep {
            commands,
            keep_running: false,
        };
    }

    CoreStep::running(commands)
}
