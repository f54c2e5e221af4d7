use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sitepipe::build::{BuildStep, ScheduledStep, StepOutcome};
use sitepipe::engine::RuntimeEvent;
use sitepipe::errors::Result;
use sitepipe::exec::ExecutorBackend;
use tokio::sync::mpsc;

/// Shared log of `(step, cycle_id)` in dispatch order.
pub type ExecutedLog = Arc<Mutex<Vec<(BuildStep, u64)>>>;

/// A fake executor that:
/// - records which steps were "run"
/// - reports `StepCompleted` for each, with `Success` unless an outcome was
///   configured for that step
/// - optionally waits before reporting, to simulate a slow step.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: ExecutedLog,
    outcomes: HashMap<BuildStep, StepOutcome>,
    delay: Option<Duration>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, executed: ExecutedLog) -> Self {
        Self {
            runtime_tx,
            executed,
            outcomes: HashMap::new(),
            delay: None,
        }
    }

    pub fn with_outcome(mut self, step: BuildStep, outcome: StepOutcome) -> Self {
        self.outcomes.insert(step, outcome);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Steps from the log, without cycle ids.
pub fn executed_steps(log: &ExecutedLog) -> Vec<BuildStep> {
    log.lock().unwrap().iter().map(|(s, _)| *s).collect()
}

/// Number of distinct cycles that dispatched at least one step.
pub fn cycle_count(log: &ExecutedLog) -> usize {
    let mut ids: Vec<u64> = log.lock().unwrap().iter().map(|(_, id)| *id).collect();
    ids.dedup();
    ids.len()
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_steps(
        &mut self,
        steps: Vec<ScheduledStep>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let delay = self.delay;

        Box::pin(async move {
            for s in steps {
                executed.lock().unwrap().push((s.step, s.cycle_id));

                let event = RuntimeEvent::StepCompleted {
                    step: s.step,
                    cycle_id: s.cycle_id,
                    outcome: self
                        .outcomes
                        .get(&s.step)
                        .copied()
                        .unwrap_or(StepOutcome::Success),
                };

                match delay {
                    Some(delay) => {
                        let tx = tx.clone();
                        tokio::spawn(async move {
                            tokio::time::sleep(delay).await;
                            let _ = tx.send(event).await;
                        });
                    }
                    None => tx
                        .send(event)
                        .await
                        .map_err(|e| anyhow::anyhow!("runtime channel closed: {e}"))?,
                }
            }
            Ok(())
        })
    }
}
