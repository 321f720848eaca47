// src/engine/dispatcher.rs

//! Admission control: WAITING -> QUEUED -> RUNNING.

use chrono::Utc;
use tracing::{debug, info};

use crate::dag::{StepId, StepStatus};
use crate::engine::job::Job;
use crate::errors::Result;

impl Job {
    /// Whether every dependency of `id` is in `completed`.
    ///
    /// A dependency that ended FAILED, CANCELED or ABORTED never satisfies
    /// this, so its dependents never start.
    pub fn dependencies_met(&self, id: &str) -> bool {
        let Some(step) = self.steps.get(id) else {
            return false;
        };
        step.dependencies()
            .iter()
            .all(|dep| self.completed.iter().any(|done| done == dep))
    }

    /// Queue every WAITING step whose dependencies are met, in id order.
    ///
    /// Returns the newly queued ids. Calling this again without any state
    /// change queues nothing.
    pub fn queue_runnables(&mut self) -> Vec<StepId> {
        let candidates: Vec<StepId> = self
            .steps
            .values()
            .filter(|s| s.status() == StepStatus::Waiting)
            .filter(|s| !self.queue.contains(&s.id))
            .filter(|s| self.dependencies_met(&s.id))
            .map(|s| s.id.clone())
            .collect();

        let now = Utc::now();
        let mut queued = Vec::with_capacity(candidates.len());
        for id in candidates {
            if let Some(step) = self.steps.get_mut(&id) {
                if step.transition(StepStatus::Queued).is_err() {
                    continue;
                }
                step.queued_at = Some(now);
                debug!(step = %id, "dependencies met; queued");
                self.queue.push_back(id.clone());
                queued.push(id);
            }
        }

        if !queued.is_empty() {
            info!(steps = ?queued, "queued runnable steps");
        }
        queued
    }

    /// Whether another step may enter RUNNING right now.
    pub fn has_free_slot(&self) -> bool {
        self.running_count() < self.concurrency_limit
    }

    /// Pop the head of the run queue and mark it RUNNING, if the queue is
    /// non-empty and the concurrency ceiling allows it.
    ///
    /// The running count is recomputed on every call, so a caller looping on
    /// this never exceeds the ceiling.
    pub fn start_next_queued(&mut self) -> Result<Option<StepId>> {
        if self.queue.is_empty() || !self.has_free_slot() {
            return Ok(None);
        }
        let Some(id) = self.queue.pop_front() else {
            return Ok(None);
        };

        let step = self.step_mut(&id)?;
        step.transition(StepStatus::Running)?;
        step.started_at = Some(Utc::now());
        debug!(step = %id, "dispatching");
        Ok(Some(id))
    }
}
