// src/exec/backend.rs

//! Pluggable process backend abstraction.
//!
//! The controller talks to a `ProcessBackend` instead of spawning commands
//! itself. Production uses [`OsProcessBackend`](super::OsProcessBackend);
//! tests provide backends whose children exit with scripted codes after a
//! scripted number of polls.

use std::fmt;

use crate::dag::StepId;
use crate::errors::Result;

/// Result code recorded for a step whose process could not be started or
/// whose liveness could not be checked.
pub const SPAWN_FAILURE_CODE: i32 = -1;

/// Trait abstracting how `os` steps are started.
pub trait ProcessBackend: Send {
    /// Start `argv[0]` with the remaining words as arguments for `step` and
    /// return a handle to the running child.
    ///
    /// Errors are treated as an immediate failure of the step.
    fn spawn(&mut self, step: &StepId, argv: &[String]) -> Result<Box<dyn RunningProcess>>;
}

/// Handle to a started child, owned by the controller while the step runs.
///
/// Dropping the handle releases the child and its output resource.
pub trait RunningProcess: Send + fmt::Debug {
    fn pid(&self) -> Option<u32>;

    /// Non-blocking liveness check: `None` while running, the exit code once
    /// finished.
    fn try_exit_code(&mut self) -> Result<Option<i32>>;

    /// Stop the child forcibly.
    fn kill(&mut self) -> Result<()>;
}
