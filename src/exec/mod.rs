// src/exec/mod.rs

//! Step execution layer.
//!
//! This module runs the build steps the scheduler dispatches and reports back
//! to the orchestration runtime via `RuntimeEvent`s.
//!
//! - [`step_runner`] maps a single [`BuildStep`](crate::build::BuildStep) to
//!   the asset compiler or the site generator and turns the result into a
//!   [`StepOutcome`](crate::build::StepOutcome).
//! - [`backend`] provides the `ExecutorBackend` trait and a concrete
//!   `RealExecutorBackend` that the runtime uses in production, and which
//!   tests can replace with a fake implementation.

pub mod backend;
pub mod step_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use step_runner::{run_step, BuildContext};
