// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sending `ScheduledStep`s to the executor
//! - starting the dev server
//! - handling Ctrl+C / shutdown
//!
//! The core is unit tested without any Tokio, channels, filesystem, or
//! processes.

use crate::build::{BuildStep, Scheduler};
use crate::engine::event_handlers::{
    handle_cycle_request, handle_shutdown, handle_step_completion, CoreState, CoreStep,
};
use crate::engine::pending::PendingCycle;
use crate::engine::{Phase, RuntimeEvent, RuntimeOptions};

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    pending: PendingCycle,
    options: RuntimeOptions,
    server_started: bool,
    cycles_completed: u64,
}

impl CoreRuntime {
    pub fn new(options: RuntimeOptions) -> Self {
        // One-shot commands stop at the first failure; long-running ones
        // keep going and retry on the next trigger.
        let scheduler = Scheduler::new(options.exit_when_idle);
        Self {
            scheduler,
            pending: PendingCycle::new(),
            options,
            server_started: false,
            cycles_completed: 0,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    pub fn pending_is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed
    }

    pub fn phase(&self) -> Phase {
        let running = self.scheduler.running();
        if running.contains(&BuildStep::Clean) {
            return Phase::Cleaning;
        }
        if running.contains(&BuildStep::CompileScripts)
            || running.contains(&BuildStep::CompileStyles)
        {
            return Phase::Compiling;
        }
        if running.contains(&BuildStep::Generate) {
            return Phase::Generating;
        }
        if self.cycles_completed == 0 || self.options.exit_when_idle {
            return Phase::Idle;
        }
        if self.server_started {
            return Phase::Serving;
        }
        Phase::Watching
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        let mut state = CoreState {
            scheduler: &mut self.scheduler,
            pending: &mut self.pending,
            options: &self.options,
            server_started: &mut self.server_started,
            cycles_completed: &mut self.cycles_completed,
        };

        match event {
            RuntimeEvent::CycleRequested { steps, reason } => {
                handle_cycle_request(&mut state, steps, reason)
            }
            RuntimeEvent::StepCompleted {
                step,
                cycle_id,
                outcome,
            } => handle_step_completion(&mut state, step, cycle_id, outcome),
            RuntimeEvent::ShutdownRequested => handle_shutdown(&mut state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{ScheduledStep, StepOutcome, StepSet};
    use crate::engine::{CoreCommand, TriggerReason};
    use crate::types::BuildSequence;

    fn request(seq: BuildSequence) -> RuntimeEvent {
        RuntimeEvent::CycleRequested {
            steps: StepSet::from(seq),
            reason: TriggerReason::FileWatch,
        }
    }

    fn done(step: BuildStep, cycle_id: u64, outcome: StepOutcome) -> RuntimeEvent {
        RuntimeEvent::StepCompleted {
            step,
            cycle_id,
            outcome,
        }
    }

    fn dispatched(step: &CoreStep) -> Vec<ScheduledStep> {
        step.commands
            .iter()
            .filter_map(|c| match c {
                CoreCommand::DispatchSteps(s) => Some(s.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    #[test]
    fn serve_starts_server_after_first_cycle_only() {
        let mut core = CoreRuntime::new(RuntimeOptions {
            exit_when_idle: false,
            start_server: true,
        });

        core.step(request(BuildSequence::Generate));
        assert_eq!(core.phase(), Phase::Generating);
        let step = core.step(done(BuildStep::Generate, 1, StepOutcome::Success));
        assert!(step.commands.contains(&CoreCommand::StartServer));
        assert!(step.keep_running);
        assert_eq!(core.phase(), Phase::Serving);

        core.step(request(BuildSequence::Generate));
        let step = core.step(done(BuildStep::Generate, 2, StepOutcome::Success));
        assert!(!step.commands.contains(&CoreCommand::StartServer));
    }

    #[test]
    fn triggers_during_a_cycle_coalesce_into_one_follow_up() {
        let mut core = CoreRuntime::new(RuntimeOptions::default());

        core.step(request(BuildSequence::Generate));
        for _ in 0..5 {
            let step = core.step(request(BuildSequence::Compile));
            assert!(dispatched(&step).is_empty());
        }

        let step = core.step(done(BuildStep::Generate, 1, StepOutcome::Success));
        let next = dispatched(&step);
        assert_eq!(
            next.iter().map(|s| s.step).collect::<Vec<_>>(),
            vec![BuildStep::CompileScripts, BuildStep::CompileStyles]
        );
        assert!(next.iter().all(|s| s.cycle_id == 2));
        assert!(core.pending_is_empty());
    }

    #[test]
    fn one_shot_failure_requests_unsuccessful_exit() {
        let mut core = CoreRuntime::new(RuntimeOptions {
            exit_when_idle: true,
            start_server: false,
        });

        core.step(request(BuildSequence::Full));
        assert_eq!(core.phase(), Phase::Cleaning);
        let step = core.step(done(BuildStep::Clean, 1, StepOutcome::Failed(-1)));

        assert!(!step.keep_running);
        assert!(step
            .commands
            .contains(&CoreCommand::RequestExit { success: false }));
    }

    #[test]
    fn watch_without_server_is_watching_between_cycles() {
        let mut core = CoreRuntime::new(RuntimeOptions::default());
        assert_eq!(core.phase(), Phase::Idle);

        core.step(request(BuildSequence::Compile));
        assert_eq!(core.phase(), Phase::Compiling);
        core.step(done(BuildStep::CompileScripts, 1, StepOutcome::Success));
        core.step(done(BuildStep::CompileStyles, 1, StepOutcome::Success));
        assert_eq!(core.phase(), Phase::Watching);
    }

    #[test]
    fn shutdown_stops_the_loop() {
        let mut core = CoreRuntime::new(RuntimeOptions::default());
        let step = core.step(RuntimeEvent::ShutdownRequested);
        assert!(!step.keep_running);
        assert!(step.commands.is_empty());
    }

    #[test]
    fn interrupting_a_one_shot_cycle_exits_unsuccessfully() {
        let mut core = CoreRuntime::new(RuntimeOptions {
            exit_when_idle: true,
            start_server: false,
        });

        core.step(request(BuildSequence::Full));
        let step = core.step(RuntimeEvent::ShutdownRequested);

        assert!(!step.keep_running);
        assert_eq!(step.commands, vec![CoreCommand::RequestExit { success: false }]);
    }

    #[test]
    fn interrupting_watch_mode_is_not_a_failure() {
        let mut core = CoreRuntime::new(RuntimeOptions::default());

        core.step(request(BuildSequence::Full));
        let step = core.step(RuntimeEvent::ShutdownRequested);

        assert!(!step.keep_running);
        assert!(step.commands.is_empty());
    }
}
