// src/engine/cancel.rs

//! Cascading cancellation of descendants.

use chrono::Utc;
use tracing::{info, warn};

use crate::dag::{StepId, StepStatus};
use crate::engine::job::Job;
use crate::errors::Result;

impl Job {
    /// Cancel every WAITING or QUEUED descendant of `id`, in id order.
    ///
    /// Running and finished descendants are left alone. Returns the ids that
    /// were newly canceled.
    pub fn cancel_descendants(&mut self, id: &str) -> Vec<StepId> {
        let mut canceled = Vec::new();

        for child in self.graph.descendants(id) {
            let Some(step) = self.steps.get_mut(&child) else {
                continue;
            };
            if !step.status().is_runnable() {
                continue;
            }
            if step.transition(StepStatus::Canceled).is_ok() {
                warn!(step = %child, upstream = %id, "canceled due to upstream step");
                canceled.push(child);
            }
        }

        if !canceled.is_empty() {
            self.queue.retain(|q| !canceled.contains(q));
        }
        canceled
    }

    /// Mark a RUNNING step as ABORTED and cancel its descendants.
    ///
    /// The caller is responsible for stopping the backing process first.
    pub fn abort_step(&mut self, id: &str) -> Result<Vec<StepId>> {
        let step = self.step_mut(id)?;
        step.transition(StepStatus::Aborted)?;
        step.stopped_at = Some(Utc::now());
        info!(step = %id, "step aborted");

        Ok(self.cancel_descendants(id))
    }
}
