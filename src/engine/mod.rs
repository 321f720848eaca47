// src/engine/mod.rs

//! Job execution engine.
//!
//! - [`job`] owns the aggregate state (steps, run queue, completed/failed).
//! - [`dispatcher`] moves steps from WAITING to QUEUED to RUNNING under the
//!   concurrency ceiling.
//! - [`cancel`] cascades cancellation through descendants.
//! - [`controller`] drives the poll loop against the execution backends.
//! - [`snapshot`] and [`summary`] expose the job to persistence and reporting.

pub mod cancel;
pub mod controller;
pub mod dispatcher;
pub mod job;
pub mod snapshot;
pub mod summary;

pub use controller::{ControllerOptions, JobController};
pub use job::{Job, StepOutcome};
pub use snapshot::{JobSnapshot, StepRecord};
pub use summary::{JobSummary, StepDetail};

/// Events delivered to the controller from outside the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// Abort running steps and stop (e.g. Ctrl-C).
    CancelRequested,
}

/// How the controller loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// No step is runnable or running any more.
    Finished,
    /// A cancel request was honoured.
    Canceled,
}
