// src/engine/mod.rs

//! Orchestration engine for sitepipe.
//!
//! This module ties together:
//! - the step scheduler (one build cycle at a time)
//! - the pending cycle (what happens when triggers arrive mid-cycle)
//! - the main runtime event loop that reacts to:
//!   - cycle requests (startup, file watcher)
//!   - step completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::fmt;

use crate::build::{BuildStep, StepOutcome, StepSet};

/// Why a cycle was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// The command's initial cycle.
    Manual,
    /// A debounced batch of filesystem events.
    FileWatch,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// Exit once the first cycle (and anything pending) is done. Set for
    /// one-shot commands.
    pub exit_when_idle: bool,
    /// Start the dev server after the first cycle.
    pub start_server: bool,
}

/// Events flowing into the runtime from the watcher, executor, etc.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// Run these steps, now or as soon as the active cycle is over.
    CycleRequested {
        steps: StepSet,
        reason: TriggerReason,
    },
    /// A dispatched step finished.
    StepCompleted {
        step: BuildStep,
        cycle_id: u64,
        outcome: StepOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Coarse orchestrator state, derived from the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Cleaning,
    Compiling,
    Generating,
    /// Dev server is up and no cycle is running.
    Serving,
    /// First cycle done, no dev server; waiting for watcher triggers.
    Watching,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Idle => "idle",
            Phase::Cleaning => "cleaning",
            Phase::Compiling => "compiling",
            Phase::Generating => "generating",
            Phase::Serving => "serving",
            Phase::Watching => "watching",
        };
        f.write_str(s)
    }
}

pub mod core;
pub mod event_handlers;
pub mod pending;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use pending::PendingCycle;
pub use runtime::{Runtime, ServerStarter};
