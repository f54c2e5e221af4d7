// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of running steps
//! itself. This makes it easy to swap in a fake executor in tests.
//!
//! - `RealExecutorBackend` is the default implementation used by `sitepipe`.
//!   It spawns one Tokio task per dispatched step and sends `StepCompleted`
//!   back when the step is done.
//! - Tests can provide their own `ExecutorBackend` that, for example, records
//!   which steps were scheduled and directly emits `StepCompleted` events.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::build::ScheduledStep;
use crate::engine::RuntimeEvent;
use crate::errors::Result;

use super::step_runner::{run_step, BuildContext};

/// Trait abstracting how scheduled steps are executed.
///
/// Production code uses [`RealExecutorBackend`]; tests can provide their own
/// implementation that doesn't touch the filesystem or spawn processes.
pub trait ExecutorBackend: Send {
    /// Dispatch the given steps for execution.
    ///
    /// Must not wait for the steps to finish; completion is reported through
    /// a `RuntimeEvent::StepCompleted`.
    fn spawn_steps(
        &mut self,
        steps: Vec<ScheduledStep>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Real executor backend used in production.
pub struct RealExecutorBackend {
    ctx: Arc<BuildContext>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl RealExecutorBackend {
    pub fn new(ctx: Arc<BuildContext>, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self { ctx, runtime_tx }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_steps(
        &mut self,
        steps: Vec<ScheduledStep>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for scheduled in steps {
                let ctx = Arc::clone(&self.ctx);
                let tx = self.runtime_tx.clone();

                tokio::spawn(async move {
                    let ScheduledStep { step, cycle_id } = scheduled;
                    debug!(step = %step, cycle_id, "step started");
                    let outcome = run_step(step, &ctx).await;

                    let event = RuntimeEvent::StepCompleted {
                        step,
                        cycle_id,
                        outcome,
                    };
                    if tx.send(event).await.is_err() {
                        error!(step = %step, "runtime channel closed; dropping step completion");
                    }
                });
            }
            Ok(())
        })
    }
}
