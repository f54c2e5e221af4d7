// src/build/scheduler.rs

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::build::graph::StepGraph;
use crate::build::scheduler_step::{
    CycleOutcome, CycleSummary, ScheduledStep, SchedulerStep, StepState,
};
use crate::build::step::{BuildStep, StepOutcome, StepSet};

#[derive(Debug)]
struct ActiveCycle {
    id: u64,
    steps: StepSet,
    states: BTreeMap<BuildStep, StepState>,
}

/// Per-cycle state machine over the fixed [`StepGraph`].
///
/// It is responsible for:
/// - starting a cycle for a set of steps
/// - deciding when a step is ready (every included dependency terminal)
/// - recording outcomes and skipping dependents of failures when
///   `abort_on_failure` is set
/// - reporting when the cycle is finished
///
/// At most one cycle is active at a time.
#[derive(Debug)]
pub struct Scheduler {
    graph: StepGraph,
    abort_on_failure: bool,
    cycle_counter: u64,
    current: Option<ActiveCycle>,
}

impl Scheduler {
    /// `abort_on_failure`: a failed step skips its dependents (one-shot
    /// commands). Otherwise dependents still run after a failure.
    pub fn new(abort_on_failure: bool) -> Self {
        Self {
            graph: StepGraph::new(),
            abort_on_failure,
            cycle_counter: 0,
            current: None,
        }
    }

    pub fn graph(&self) -> &StepGraph {
        &self.graph
    }

    pub fn is_idle(&self) -> bool {
        self.current.is_none()
    }

    pub fn current_cycle_id(&self) -> Option<u64> {
        self.current.as_ref().map(|c| c.id)
    }

    /// State of `step` in the active cycle, `None` if it is not part of it.
    pub fn state_of(&self, step: BuildStep) -> Option<StepState> {
        self.current.as_ref()?.states.get(&step).copied()
    }

    /// Steps currently dispatched.
    pub fn running(&self) -> Vec<BuildStep> {
        self.current
            .as_ref()
            .map(|c| {
                c.states
                    .iter()
                    .filter(|(_, s)| **s == StepState::Running)
                    .map(|(step, _)| *step)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Start a new cycle. Must only be called while idle.
    pub fn start_cycle(&mut self, steps: StepSet) -> SchedulerStep {
        if let Some(active) = &self.current {
            warn!(
                cycle_id = active.id,
                "start_cycle called while a cycle is active; ignoring"
            );
            return SchedulerStep::default();
        }

        self.cycle_counter += 1;
        let id = self.cycle_counter;
        let states = steps.iter().map(|s| (s, StepState::Pending)).collect();
        info!(cycle_id = id, steps = %steps, "starting build cycle");

        self.current = Some(ActiveCycle { id, steps, states });
        self.advance()
    }

    /// Record the outcome of a dispatched step.
    ///
    /// Completions for another cycle or for a step that is not running are
    /// ignored.
    pub fn handle_completion(
        &mut self,
        step: BuildStep,
        cycle_id: u64,
        outcome: StepOutcome,
    ) -> SchedulerStep {
        let Some(active) = self.current.as_mut() else {
            warn!(step = %step, cycle_id, "completion with no active cycle; ignoring");
            return SchedulerStep::default();
        };
        if active.id != cycle_id {
            warn!(
                step = %step,
                cycle_id,
                active = active.id,
                "completion for a stale cycle; ignoring"
            );
            return SchedulerStep::default();
        }

        match active.states.get_mut(&step) {
            Some(state) if *state == StepState::Running => {
                *state = StepState::Done(outcome);
            }
            other => {
                warn!(step = %step, cycle_id, state = ?other, "unexpected completion; ignoring");
                return SchedulerStep::default();
            }
        }

        match outcome {
            StepOutcome::Success => debug!(step = %step, cycle_id, "step succeeded"),
            StepOutcome::Degraded(errors) => {
                warn!(step = %step, cycle_id, errors, "step finished with errors")
            }
            StepOutcome::Failed(code) => warn!(step = %step, cycle_id, code, "step failed"),
        }

        self.advance()
    }

    /// Dispatch every ready step, skip blocked ones, and finish the cycle
    /// once every step is terminal.
    fn advance(&mut self) -> SchedulerStep {
        let Some(active) = self.current.as_mut() else {
            return SchedulerStep::default();
        };

        let mut result = SchedulerStep::default();

        // Skipping can cascade, so loop until nothing changes.
        loop {
            let mut changed = false;
            for step in active.steps.iter() {
                if active.states.get(&step) != Some(&StepState::Pending) {
                    continue;
                }
                let deps = self.graph.dependencies_within(step, &active.steps);
                let dep_states: Vec<StepState> = deps
                    .iter()
                    .filter_map(|d| active.states.get(d).copied())
                    .collect();

                if !dep_states.iter().all(StepState::is_terminal) {
                    continue;
                }

                if self.abort_on_failure && dep_states.iter().any(StepState::blocks_dependents) {
                    warn!(step = %step, cycle_id = active.id, "dependency failed; skipping step");
                    active.states.insert(step, StepState::Skipped);
                    result.newly_skipped.push(step);
                } else {
                    debug!(step = %step, cycle_id = active.id, "step ready");
                    active.states.insert(step, StepState::Running);
                    result.newly_scheduled.push(ScheduledStep {
                        step,
                        cycle_id: active.id,
                    });
                }
                changed = true;
            }
            if !changed {
                break;
            }
        }

        if active.states.values().all(StepState::is_terminal) {
            let summary = summarize(&self.graph, active);
            info!(
                cycle_id = summary.cycle_id,
                outcome = ?summary.outcome,
                "build cycle finished"
            );
            result.cycle_finished = Some(summary);
            self.current = None;
        }

        result
    }
}

fn summarize(graph: &StepGraph, active: &ActiveCycle) -> CycleSummary {
    let steps: Vec<(BuildStep, StepState)> = graph
        .ordered(&active.steps)
        .into_iter()
        .filter_map(|s| active.states.get(&s).map(|state| (s, *state)))
        .collect();

    let outcome = if steps.iter().any(|(_, s)| s.blocks_dependents()) {
        CycleOutcome::Failed
    } else if steps
        .iter()
        .any(|(_, s)| matches!(s, StepState::Done(StepOutcome::Degraded(_))))
    {
        CycleOutcome::Degraded
    } else {
        CycleOutcome::Success
    };

    CycleSummary {
        cycle_id: active.id,
        outcome,
        steps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BuildSequence;

    fn steps(s: &SchedulerStep) -> Vec<BuildStep> {
        s.newly_scheduled.iter().map(|s| s.step).collect()
    }

    #[test]
    fn full_cycle_runs_clean_then_compiles_in_parallel_then_generate() {
        let mut sched = Scheduler::new(true);

        let s = sched.start_cycle(StepSet::from(BuildSequence::Full));
        assert_eq!(steps(&s), vec![BuildStep::Clean]);
        let id = sched.current_cycle_id().unwrap();

        let s = sched.handle_completion(BuildStep::Clean, id, StepOutcome::Success);
        assert_eq!(
            steps(&s),
            vec![BuildStep::CompileScripts, BuildStep::CompileStyles]
        );

        // Barrier: generate waits for both compiles.
        let s = sched.handle_completion(BuildStep::CompileStyles, id, StepOutcome::Success);
        assert!(s.newly_scheduled.is_empty());

        let s = sched.handle_completion(BuildStep::CompileScripts, id, StepOutcome::Degraded(1));
        assert_eq!(steps(&s), vec![BuildStep::Generate]);

        let s = sched.handle_completion(BuildStep::Generate, id, StepOutcome::Success);
        let summary = s.cycle_finished.unwrap();
        assert_eq!(summary.outcome, CycleOutcome::Degraded);
        assert!(sched.is_idle());
    }

    #[test]
    fn failure_skips_dependents_when_aborting() {
        let mut sched = Scheduler::new(true);
        sched.start_cycle(StepSet::from(BuildSequence::Full));
        let id = sched.current_cycle_id().unwrap();

        let s = sched.handle_completion(BuildStep::Clean, id, StepOutcome::Failed(-1));

        assert!(s.newly_scheduled.is_empty());
        assert_eq!(s.newly_skipped.len(), 3);
        let summary = s.cycle_finished.unwrap();
        assert_eq!(summary.outcome, CycleOutcome::Failed);
        assert_eq!(summary.state_of(BuildStep::Generate), Some(StepState::Skipped));
    }

    #[test]
    fn failure_does_not_stop_dependents_in_watch_mode() {
        let mut sched = Scheduler::new(false);
        sched.start_cycle(StepSet::from(BuildSequence::Rebuild));
        let id = sched.current_cycle_id().unwrap();

        sched.handle_completion(BuildStep::CompileScripts, id, StepOutcome::Failed(-1));
        let s = sched.handle_completion(BuildStep::CompileStyles, id, StepOutcome::Success);

        assert_eq!(steps(&s), vec![BuildStep::Generate]);
    }

    #[test]
    fn stale_completion_is_ignored() {
        let mut sched = Scheduler::new(false);
        sched.start_cycle(StepSet::from(BuildSequence::Generate));
        let id = sched.current_cycle_id().unwrap();

        let s = sched.handle_completion(BuildStep::Generate, id + 7, StepOutcome::Success);
        assert_eq!(s, SchedulerStep::default());
        assert_eq!(sched.state_of(BuildStep::Generate), Some(StepState::Running));
    }

    #[test]
    fn empty_cycle_finishes_immediately() {
        let mut sched = Scheduler::new(false);
        let s = sched.start_cycle(StepSet::new());
        assert!(s.cycle_finished.unwrap().is_success());
        assert!(sched.is_idle());
    }
}
