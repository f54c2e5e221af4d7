// src/engine/pending.rs

use tracing::debug;

use crate::build::StepSet;

/// Requests that arrive while a cycle is running.
///
/// There is a single slot: every request folds into it by union, and the
/// next cycle runs the merged set once. However many saves happen during a
/// long generator run, at most one follow-up cycle is queued.
#[derive(Debug, Default)]
pub struct PendingCycle {
    steps: StepSet,
    requests: usize,
}

impl PendingCycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, steps: &StepSet) {
        self.steps.merge(steps);
        self.requests += 1;
        debug!(
            requests = self.requests,
            steps = %self.steps,
            "coalesced request into pending cycle"
        );
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of requests folded in since the last `take`.
    pub fn requests(&self) -> usize {
        self.requests
    }

    pub fn take(&mut self) -> StepSet {
        self.requests = 0;
        std::mem::take(&mut self.steps)
    }
}
