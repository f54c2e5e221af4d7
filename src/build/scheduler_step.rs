// src/build/scheduler_step.rs

//! Step-by-step result types for the scheduler.

use crate::build::step::{BuildStep, StepOutcome};

/// A step dispatched for a particular cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledStep {
    pub step: BuildStep,
    pub cycle_id: u64,
}

/// Per-cycle state of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    /// Waiting on dependencies.
    Pending,
    /// Dispatched to the executor.
    Running,
    Done(StepOutcome),
    /// Never ran because a dependency failed (one-shot commands only).
    Skipped,
}

impl StepState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepState::Done(_) | StepState::Skipped)
    }

    /// Whether dependents should be skipped when failures abort the cycle.
    pub fn blocks_dependents(&self) -> bool {
        matches!(self, StepState::Done(StepOutcome::Failed(_)) | StepState::Skipped)
    }
}

/// Overall result of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Success,
    /// Every step finished but some inputs kept their previous output.
    Degraded,
    /// A step failed or was skipped.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    pub cycle_id: u64,
    pub outcome: CycleOutcome,
    /// Final state of every step in the cycle, in execution order.
    pub steps: Vec<(BuildStep, StepState)>,
}

impl CycleSummary {
    pub fn is_success(&self) -> bool {
        self.outcome == CycleOutcome::Success
    }

    pub fn state_of(&self, step: BuildStep) -> Option<StepState> {
        self.steps
            .iter()
            .find(|(s, _)| *s == step)
            .map(|(_, state)| *state)
    }
}

/// Structured result of a single scheduler "step".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStep {
    /// Steps that became ready to run.
    pub newly_scheduled: Vec<ScheduledStep>,
    /// Steps newly marked as skipped.
    pub newly_skipped: Vec<BuildStep>,
    /// Set when this call finished the active cycle.
    pub cycle_finished: Option<CycleSummary>,
}
