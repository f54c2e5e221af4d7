// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::build::{CycleSummary, ScheduledStep};
use crate::errors::{Result, SitepipeError};
use crate::exec::ExecutorBackend;
use crate::server::ServerHandle;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent};

/// Starts the dev server when the core asks for it. Called at most once.
pub type ServerStarter = Box<dyn FnOnce() -> Result<ServerHandle> + Send>;

/// Drives the step scheduler in response to `RuntimeEvent`s, and delegates
/// step execution to an `ExecutorBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics. This struct handles async IO: reading events from
/// channels, dispatching steps to the executor and owning the dev server.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    server_starter: Option<ServerStarter>,
    server: Option<ServerHandle>,
    last_cycle: Option<CycleSummary>,
    exit_failed: bool,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("server_running", &self.server.is_some())
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
            server_starter: None,
            server: None,
            last_cycle: None,
            exit_failed: false,
        }
    }

    pub fn with_server(mut self, starter: ServerStarter) -> Self {
        self.server_starter = Some(starter);
        self
    }

    /// Main event loop.
    ///
    /// - Consumes `RuntimeEvent`s from `event_rx`.
    /// - Feeds them into the core runtime.
    /// - Executes commands returned by the core (dispatch steps, start the
    ///   server, exit).
    ///
    /// Returns `Err(BuildFailed)` when a one-shot cycle did not fully
    /// succeed.
    pub async fn run(mut self) -> Result<()> {
        info!("sitepipe runtime started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, phase = %self.core.phase(), "runtime received event");

            let step = self.core.step(event);
            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        if let Some(server) = self.server.take() {
            server.shutdown();
        }

        if self.exit_failed {
            let detail = self
                .last_cycle
                .as_ref()
                .map(describe_cycle)
                .unwrap_or_else(|| "interrupted before the cycle finished".to_string());
            return Err(SitepipeError::BuildFailed(detail));
        }

        info!("runtime exiting");
        Ok(())
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchSteps(steps) => {
                self.dispatch(steps).await?;
            }
            CoreCommand::CycleFinished(summary) => {
                info!(
                    cycle_id = summary.cycle_id,
                    outcome = ?summary.outcome,
                    "{}",
                    describe_cycle(&summary)
                );
                self.last_cycle = Some(summary);
            }
            CoreCommand::StartServer => match self.server_starter.take() {
                Some(start) => {
                    let handle = start()?;
                    info!(url = %handle.url(), "dev server listening");
                    self.server = Some(handle);
                }
                None => warn!("server start requested but none is configured"),
            },
            CoreCommand::RequestExit { success } => {
                debug!(success, "core issued RequestExit command");
                self.exit_failed = !success;
            }
        }
        Ok(())
    }

    async fn dispatch(&mut self, steps: Vec<ScheduledStep>) -> Result<()> {
        if steps.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = steps.iter().map(|s| s.step.name()).collect();
        debug!(?names, "dispatching ready steps");

        self.executor.spawn_steps(steps).await
    }
}

fn describe_cycle(summary: &CycleSummary) -> String {
    let steps: Vec<String> = summary
        .steps
        .iter()
        .map(|(step, state)| format!("{step}={state:?}"))
        .collect();
    format!(
        "cycle {} {:?}: {}",
        summary.cycle_id,
        summary.outcome,
        steps.join(", ")
    )
}
