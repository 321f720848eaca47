// src/dag/step.rs

//! Step definitions and the mutable per-step record.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::dag::status::StepStatus;
use crate::errors::{JobError, Result};
use crate::notify::MailMessage;

/// Canonical step id type used throughout the crate.
pub type StepId = String;

/// Declared dependencies, before `All` is resolved by the graph.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Dependencies {
    #[default]
    None,
    /// Depends on every other step in the job.
    All,
    Ids(BTreeSet<StepId>),
}

/// Built-in tasks run on the control loop.
#[derive(Debug, Clone, PartialEq)]
pub enum InternalTask {
    /// Pause the control loop for the given duration.
    Sleep { duration: Duration },
    /// Deliver a mail message through the configured notifier.
    SendMail(MailMessage),
}

/// What a step does when dispatched.
#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    /// Spawn `argv[0]` with the remaining words as arguments. No shell is
    /// involved, so `;`, `|` or `$VAR` reach the program literally.
    Process { argv: Vec<String> },
    Internal(InternalTask),
}

/// Split a command line into words with POSIX shell quoting rules.
///
/// Returns `None` for unbalanced quotes or a line without any word.
pub fn split_command_line(line: &str) -> Option<Vec<String>> {
    shlex::split(line).filter(|argv| !argv.is_empty())
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepKind::Process { argv } => {
                let line = shlex::try_join(argv.iter().map(String::as_str))
                    .unwrap_or_else(|_| argv.join(" "));
                write!(f, "os: {line}")
            }
            StepKind::Internal(InternalTask::Sleep { duration }) => {
                write!(f, "internal: sleep {}s", duration.as_secs_f64())
            }
            StepKind::Internal(InternalTask::SendMail(msg)) => {
                write!(f, "internal: send_mail to {}", msg.to.join(","))
            }
        }
    }
}

/// Validated, immutable description of a step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepSpec {
    pub id: StepId,
    pub name: String,
    pub kind: StepKind,
    pub dependencies: Dependencies,
    pub allowed_result_codes: BTreeSet<i32>,
    /// Never executed; completes with code 0 when dispatched.
    pub simulate: bool,
}

impl StepSpec {
    /// Process step with default settings (no deps, allowed codes `{0}`).
    ///
    /// `command` is split like a shell would split it. A line that cannot be
    /// split is kept as a single word and fails at spawn time.
    pub fn process(id: impl Into<StepId>, command: &str) -> Self {
        let argv = split_command_line(command).unwrap_or_else(|| vec![command.to_string()]);
        Self::with_argv(id, argv)
    }

    /// Process step from an already split argument vector.
    pub fn with_argv<I, S>(id: impl Into<StepId>, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind: StepKind::Process {
                argv: argv.into_iter().map(Into::into).collect(),
            },
            dependencies: Dependencies::None,
            allowed_result_codes: BTreeSet::from([0]),
            simulate: false,
        }
    }

    pub fn internal(id: impl Into<StepId>, task: InternalTask) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind: StepKind::Internal(task),
            dependencies: Dependencies::None,
            allowed_result_codes: BTreeSet::from([0]),
            simulate: false,
        }
    }

    pub fn with_dependencies(mut self, deps: Dependencies) -> Self {
        self.dependencies = deps;
        self
    }

    pub fn after<I, S>(self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StepId>,
    {
        self.with_dependencies(Dependencies::Ids(deps.into_iter().map(Into::into).collect()))
    }

    pub fn with_allowed_codes<I: IntoIterator<Item = i32>>(mut self, codes: I) -> Self {
        self.allowed_result_codes = codes.into_iter().collect();
        self
    }

    pub fn simulated(mut self, simulate: bool) -> Self {
        self.simulate = simulate;
        self
    }
}

/// Runtime record of a step: static definition plus status, timestamps and result.
#[derive(Debug, Clone)]
pub struct Step {
    pub id: StepId,
    pub name: String,
    pub kind: StepKind,
    /// Resolved dependency set; fixed after construction.
    dependencies: BTreeSet<StepId>,
    pub allowed_result_codes: BTreeSet<i32>,
    pub simulate: bool,

    status: StepStatus,
    pub queued_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub result_code: Option<i32>,
    /// OS pid while (and after) a process step ran.
    pub pid: Option<u32>,
}

impl Step {
    pub fn new(spec: &StepSpec, dependencies: BTreeSet<StepId>) -> Self {
        Self {
            id: spec.id.clone(),
            name: spec.name.clone(),
            kind: spec.kind.clone(),
            dependencies,
            allowed_result_codes: spec.allowed_result_codes.clone(),
            simulate: spec.simulate,
            status: StepStatus::Waiting,
            queued_at: None,
            started_at: None,
            stopped_at: None,
            result_code: None,
            pid: None,
        }
    }

    pub fn status(&self) -> StepStatus {
        self.status
    }

    pub fn dependencies(&self) -> &BTreeSet<StepId> {
        &self.dependencies
    }

    /// Whether `code` counts as success for this step.
    pub fn accepts(&self, code: i32) -> bool {
        self.allowed_result_codes.contains(&code)
    }

    /// `stopped_at - started_at`, once both are known.
    pub fn duration(&self) -> Option<TimeDelta> {
        Some(self.stopped_at? - self.started_at?)
    }

    /// Move to `next`, rejecting anything the state machine does not allow.
    pub fn transition(&mut self, next: StepStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(JobError::InvalidTransition {
                step: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}
