// src/build/mod.rs

//! Typed build steps and their scheduling.
//!
//! - [`step`] defines `BuildStep`, `StepOutcome` and `StepSet`.
//! - [`graph`] holds the fixed step ordering as a petgraph graph.
//! - [`scheduler`] contains the per-cycle state machine that decides which
//!   steps are ready to run.
//! - [`scheduler_step`] defines the result types for scheduler steps.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod step;

pub use graph::StepGraph;
pub use scheduler::Scheduler;
pub use scheduler_step::{CycleOutcome, CycleSummary, ScheduledStep, SchedulerStep, StepState};
pub use step::{BuildStep, StepOutcome, StepSet};
