// src/dag/status.rs

//! Step status vocabulary and legal transitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a single step.
///
/// ```text
/// Waiting -> Queued -> Running -> Complete | Failed
/// Waiting | Queued -> Canceled      (upstream failure or abort)
/// Running -> Aborted                (job-level cancel)
/// ```
///
/// Simulated steps take the normal path; their `Running` phase does no work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Not yet queued; dependencies may still be outstanding.
    Waiting,
    /// In the run queue, ready to be dispatched.
    Queued,
    /// Dispatched to a backend.
    Running,
    /// Finished with an allowed result code.
    Complete,
    /// Finished with a result code outside the allowed set.
    Failed,
    /// Never started because an ancestor failed or was aborted.
    Canceled,
    /// Killed while running by a job-level cancel.
    Aborted,
}

impl StepStatus {
    /// Still eligible to run at some point.
    pub fn is_runnable(self) -> bool {
        matches!(self, StepStatus::Waiting | StepStatus::Queued)
    }

    pub fn is_running(self) -> bool {
        matches!(self, StepStatus::Running)
    }

    /// No outgoing transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StepStatus::Complete | StepStatus::Failed | StepStatus::Canceled | StepStatus::Aborted
        )
    }

    pub fn can_transition_to(self, next: StepStatus) -> bool {
        use StepStatus::*;
        matches!(
            (self, next),
            (Waiting, Queued)
                | (Queued, Running)
                | (Running, Complete)
                | (Running, Failed)
                | (Waiting, Canceled)
                | (Queued, Canceled)
                | (Running, Aborted)
        )
    }

    /// Short description used in reports.
    pub fn description(self) -> &'static str {
        match self {
            StepStatus::Waiting => "Step has not been queued yet",
            StepStatus::Queued => "Step is in the queue and ready to run",
            StepStatus::Running => "Step is currently running",
            StepStatus::Complete => "Step completed without error",
            StepStatus::Failed => "Step failed",
            StepStatus::Canceled => "Step was canceled before it started, most likely because a dependency failed",
            StepStatus::Aborted => "Step was aborted while it was running",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepStatus::Waiting => "waiting",
            StepStatus::Queued => "queued",
            StepStatus::Running => "running",
            StepStatus::Complete => "complete",
            StepStatus::Failed => "failed",
            StepStatus::Canceled => "canceled",
            StepStatus::Aborted => "aborted",
        };
        f.write_str(s)
    }
}
