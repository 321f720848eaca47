use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of a step as declared in the job file (`"type": "os" | "internal"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    /// Spawns an OS process running the step's command line.
    Os,
    /// Runs one of the built-in tasks on the control loop.
    Internal,
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepType::Os => write!(f, "os"),
            StepType::Internal => write!(f, "internal"),
        }
    }
}

/// Built-in task names accepted for `"type": "internal"` steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    Sleep,
    SendMail,
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "sleep" => Ok(TaskType::Sleep),
            "send_mail" => Ok(TaskType::SendMail),
            other => Err(format!(
                "unknown internal task: {other} (expected \"sleep\" or \"send_mail\")"
            )),
        }
    }
}

/// Process exit code reported by the `jobctl` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobExitCode {
    /// Every step completed.
    Success,
    /// Internal or configuration error.
    InternalError,
    /// The job was canceled from outside (Ctrl-C).
    Canceled,
    /// At least one step failed, was canceled, or was aborted.
    StepFailure,
    /// The summary notification could not be delivered.
    NotificationFailure,
}

impl JobExitCode {
    pub fn code(self) -> i32 {
        match self {
            JobExitCode::Success => 0,
            JobExitCode::InternalError => 1,
            JobExitCode::Canceled => 2,
            JobExitCode::StepFailure => 3,
            JobExitCode::NotificationFailure => 4,
        }
    }
}
