// src/engine/job.rs

//! The job aggregate: steps, run queue, and completion bookkeeping.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, warn};

use crate::config::JobConfig;
use crate::dag::{Step, StepGraph, StepId, StepSpec, StepStatus};
use crate::errors::{JobError, Result};

/// Result of recording a finished step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Result code was in the allowed set.
    Complete { code: i32 },
    /// Result code was not allowed; `canceled` lists descendants that were
    /// canceled as a consequence.
    Failed { code: i32, canceled: Vec<StepId> },
}

/// Owned scheduler state for one run.
///
/// Only the controller's loop mutates a `Job`; there is no interior
/// mutability and no sharing across threads.
#[derive(Debug, Clone)]
pub struct Job {
    pub(crate) graph: StepGraph,
    pub(crate) steps: BTreeMap<StepId, Step>,
    pub(crate) concurrency_limit: usize,
    /// Ids that finished with an allowed code, in completion order.
    pub(crate) completed: Vec<StepId>,
    /// Ids that finished with a disallowed code, in completion order.
    pub(crate) failed: Vec<StepId>,
    /// Eligible ids not yet dispatched (FIFO).
    pub(crate) queue: VecDeque<StepId>,
    pub start_time: DateTime<Utc>,
    pub stop_time: Option<DateTime<Utc>>,
}

impl Job {
    /// Build a job from step specs. Fails on unknown dependencies, cycles, or
    /// a zero concurrency limit.
    pub fn new(specs: &BTreeMap<StepId, StepSpec>, concurrency_limit: usize) -> Result<Self> {
        if concurrency_limit == 0 {
            return Err(JobError::ConfigError(
                "concurrency must be >= 1 (got 0)".to_string(),
            ));
        }

        let graph = StepGraph::build(specs)?;
        graph.ensure_acyclic()?;

        let steps = specs
            .iter()
            .map(|(id, spec)| {
                let deps = graph.dependencies_of(id).cloned().unwrap_or_default();
                (id.clone(), Step::new(spec, deps))
            })
            .collect();

        Ok(Self {
            graph,
            steps,
            concurrency_limit,
            completed: Vec::new(),
            failed: Vec::new(),
            queue: VecDeque::new(),
            start_time: Utc::now(),
            stop_time: None,
        })
    }

    pub fn from_config(cfg: &JobConfig) -> Result<Self> {
        Self::new(&cfg.steps, cfg.concurrency)
    }

    pub fn graph(&self) -> &StepGraph {
        &self.graph
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.get(id)
    }

    pub(crate) fn step_mut(&mut self, id: &str) -> Result<&mut Step> {
        self.steps
            .get_mut(id)
            .ok_or_else(|| JobError::UnknownStep(id.to_string()))
    }

    /// All steps, sorted by id.
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.values()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn completed(&self) -> &[StepId] {
        &self.completed
    }

    pub fn failed(&self) -> &[StepId] {
        &self.failed
    }

    pub fn queue(&self) -> &VecDeque<StepId> {
        &self.queue
    }

    pub fn status_of(&self, id: &str) -> Option<StepStatus> {
        self.steps.get(id).map(Step::status)
    }

    /// Ids currently in `status`, sorted.
    pub fn ids_with_status(&self, status: StepStatus) -> Vec<StepId> {
        self.steps
            .values()
            .filter(|s| s.status() == status)
            .map(|s| s.id.clone())
            .collect()
    }

    pub fn canceled(&self) -> Vec<StepId> {
        self.ids_with_status(StepStatus::Canceled)
    }

    pub fn aborted(&self) -> Vec<StepId> {
        self.ids_with_status(StepStatus::Aborted)
    }

    pub fn running_ids(&self) -> Vec<StepId> {
        self.ids_with_status(StepStatus::Running)
    }

    pub fn running_count(&self) -> usize {
        self.steps.values().filter(|s| s.status().is_running()).count()
    }

    /// Any step still WAITING or QUEUED.
    pub fn has_runnable(&self) -> bool {
        self.steps.values().any(|s| s.status().is_runnable())
    }

    pub fn has_running(&self) -> bool {
        self.steps.values().any(|s| s.status().is_running())
    }

    /// Nothing left to admit or poll.
    pub fn is_done(&self) -> bool {
        !self.has_runnable() && !self.has_running()
    }

    /// Every step completed successfully.
    pub fn is_success(&self) -> bool {
        self.completed.len() == self.steps.len()
    }

    /// Stamp the job stop time.
    pub fn finish(&mut self) {
        self.stop_time = Some(Utc::now());
    }

    pub fn duration(&self) -> Option<TimeDelta> {
        self.stop_time.map(|stop| stop - self.start_time)
    }

    /// Record the result of a RUNNING step.
    ///
    /// Returns `Ok(None)` without touching any state if the step has already
    /// been recorded, so a repeated report never double-counts.
    pub fn complete_step(&mut self, id: &str, code: i32) -> Result<Option<StepOutcome>> {
        let step = self.step_mut(id)?;

        if step.status().is_terminal() {
            warn!(
                step = %id,
                status = %step.status(),
                exit_code = code,
                "completion reported for a step that already finished; ignoring"
            );
            return Ok(None);
        }

        let success = step.accepts(code);
        let next = if success {
            StepStatus::Complete
        } else {
            StepStatus::Failed
        };
        step.transition(next)?;
        step.result_code = Some(code);
        step.stopped_at = Some(Utc::now());

        if success {
            debug!(step = %id, exit_code = code, "recorded step as complete");
            self.completed.push(id.to_string());
            Ok(Some(StepOutcome::Complete { code }))
        } else {
            debug!(step = %id, exit_code = code, "recorded step as failed");
            self.failed.push(id.to_string());
            let canceled = self.cancel_descendants(id);
            Ok(Some(StepOutcome::Failed { code, canceled }))
        }
    }
}
