// src/engine/controller.rs

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::dag::{StepId, StepKind, StepStatus};
use crate::engine::job::{Job, StepOutcome};
use crate::engine::{ControlEvent, JobOutcome};
use crate::errors::{JobError, Result};
use crate::exec::{ProcessBackend, RunningProcess, SPAWN_FAILURE_CODE, run_internal};
use crate::notify::Notifier;

/// Loop timing.
#[derive(Debug, Clone, Copy)]
pub struct ControllerOptions {
    /// Pause between loop iterations.
    pub poll_interval: Duration,
    /// How often to log the list of currently running steps.
    pub running_summary_interval: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            running_summary_interval: Duration::from_secs(900),
        }
    }
}

/// Drives a [`Job`] to completion.
///
/// Owns the job, the backends and the table of running processes. Every
/// mutation happens on the task calling [`run`](Self::run); child processes
/// are only observed through non-blocking polls.
pub struct JobController<P: ProcessBackend, N: Notifier> {
    job: Job,
    processes: P,
    notifier: N,
    running: BTreeMap<StepId, Box<dyn RunningProcess>>,
    options: ControllerOptions,
    last_running_summary: Instant,
}

impl<P: ProcessBackend, N: Notifier> fmt::Debug for JobController<P, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobController")
            .field("job", &self.job)
            .field("running", &self.running.keys().collect::<Vec<_>>())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<P: ProcessBackend, N: Notifier> JobController<P, N> {
    pub fn new(job: Job, processes: P, notifier: N, options: ControllerOptions) -> Self {
        Self {
            job,
            processes,
            notifier,
            running: BTreeMap::new(),
            options,
            last_running_summary: Instant::now(),
        }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    /// Main loop.
    ///
    /// Each iteration admits runnable steps, dispatches up to the concurrency
    /// ceiling, polls running processes, then sleeps `poll_interval`. A
    /// [`ControlEvent::CancelRequested`] received at any point aborts every
    /// running step and ends the loop with [`JobOutcome::Canceled`].
    pub async fn run(&mut self, events: &mut mpsc::Receiver<ControlEvent>) -> Result<JobOutcome> {
        info!(
            steps = self.job.len(),
            concurrency = self.job.concurrency_limit(),
            "job started"
        );
        let mut listening = true;

        loop {
            if listening {
                match events.try_recv() {
                    Ok(ControlEvent::CancelRequested) => return self.finish_canceled(),
                    Err(mpsc::error::TryRecvError::Disconnected) => listening = false,
                    Err(mpsc::error::TryRecvError::Empty) => {}
                }
            }

            if self.job.is_done() {
                break;
            }

            self.step_once().await?;
            self.maybe_log_running_summary();

            if self.job.is_done() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.options.poll_interval) => {}
                event = events.recv(), if listening => match event {
                    Some(ControlEvent::CancelRequested) => return self.finish_canceled(),
                    None => listening = false,
                },
            }
        }

        self.job.finish();
        info!(
            success = self.job.is_success(),
            completed = self.job.completed().len(),
            failed = self.job.failed().len(),
            "job finished"
        );
        Ok(JobOutcome::Finished)
    }

    /// One loop iteration without the trailing sleep.
    pub async fn step_once(&mut self) -> Result<()> {
        self.job.queue_runnables();

        if self.job.queue().is_empty() && !self.job.has_running() && self.job.has_runnable() {
            let waiting = self.job.ids_with_status(StepStatus::Waiting);
            error!(steps = ?waiting, "no step can make progress");
            return Err(JobError::Stalled(waiting));
        }

        self.dispatch_queued().await?;
        self.poll_running()?;
        Ok(())
    }

    /// Dispatch queued steps in FIFO order while below the concurrency limit.
    ///
    /// Returns the dispatched ids.
    pub async fn dispatch_queued(&mut self) -> Result<Vec<StepId>> {
        let mut dispatched = Vec::new();
        while let Some(id) = self.job.start_next_queued()? {
            self.launch(&id).await?;
            dispatched.push(id);
        }
        Ok(dispatched)
    }

    /// Hand a freshly RUNNING step to the backend matching its kind.
    async fn launch(&mut self, id: &StepId) -> Result<()> {
        let (kind, simulate) = {
            let step = self
                .job
                .step(id)
                .ok_or_else(|| JobError::UnknownStep(id.clone()))?;
            (step.kind.clone(), step.simulate)
        };

        if simulate {
            info!(step = %id, "step simulated; not executed");
            return self.finish_step(id, 0);
        }

        match kind {
            StepKind::Process { argv } => match self.processes.spawn(id, &argv) {
                Ok(handle) => {
                    let pid = handle.pid();
                    self.job.step_mut(id)?.pid = pid;
                    info!(step = %id, pid, argv = ?argv, "step spawned");
                    self.running.insert(id.clone(), handle);
                    Ok(())
                }
                Err(err) => {
                    error!(step = %id, error = %err, "could not start step process");
                    self.finish_step(id, SPAWN_FAILURE_CODE)
                }
            },
            StepKind::Internal(task) => {
                info!(step = %id, "step executed");
                let code = run_internal(id, &task, &mut self.notifier).await;
                self.finish_step(id, code)
            }
        }
    }

    /// Poll every running process once and record the ones that exited.
    ///
    /// Returns the ids that finished during this poll.
    pub fn poll_running(&mut self) -> Result<Vec<StepId>> {
        let mut exited: Vec<(StepId, i32)> = Vec::new();

        for (id, handle) in self.running.iter_mut() {
            match handle.try_exit_code() {
                Ok(Some(code)) => exited.push((id.clone(), code)),
                Ok(None) => debug!(step = %id, "still running"),
                Err(err) => {
                    error!(step = %id, error = %err, "could not poll step process");
                    exited.push((id.clone(), SPAWN_FAILURE_CODE));
                }
            }
        }

        let mut finished = Vec::with_capacity(exited.len());
        for (id, code) in exited {
            self.finish_step(&id, code)?;
            finished.push(id);
        }
        Ok(finished)
    }

    /// Release the step's process handle and record its result.
    fn finish_step(&mut self, id: &StepId, code: i32) -> Result<()> {
        // Dropping the handle closes the child's output resource.
        self.running.remove(id);

        let Some(outcome) = self.job.complete_step(id, code)? else {
            return Ok(());
        };

        let (simulated, duration) = self
            .job
            .step(id)
            .map(|s| (s.simulate, s.duration()))
            .unwrap_or((false, None));
        let duration_secs = duration.map(|d| d.num_milliseconds() as f64 / 1000.0);

        match outcome {
            StepOutcome::Complete { code } => info!(
                step = %id,
                exit_code = code,
                duration_secs,
                simulated,
                "step COMPLETE"
            ),
            StepOutcome::Failed { code, canceled } => warn!(
                step = %id,
                exit_code = code,
                duration_secs,
                canceled = ?canceled,
                "step FAILED"
            ),
        }
        Ok(())
    }

    /// Kill a running step, mark it ABORTED and cancel its descendants.
    ///
    /// Returns the descendants that were canceled.
    pub fn abort_step(&mut self, id: &str) -> Result<Vec<StepId>> {
        if let Some(mut handle) = self.running.remove(id) {
            if let Err(err) = handle.kill() {
                warn!(step = %id, error = %err, "failed to kill step process");
            }
        }
        self.job.abort_step(id)
    }

    /// Abort every running step (which cascades to their descendants).
    ///
    /// Returns the aborted ids.
    pub fn cancel_job(&mut self) -> Result<Vec<StepId>> {
        let running = self.job.running_ids();
        for id in &running {
            self.abort_step(id)?;
        }
        Ok(running)
    }

    fn finish_canceled(&mut self) -> Result<JobOutcome> {
        warn!("job cancel requested; aborting running steps");
        let aborted = self.cancel_job()?;
        self.job.finish();
        warn!(aborted = ?aborted, "job canceled");
        Ok(JobOutcome::Canceled)
    }

    fn maybe_log_running_summary(&mut self) {
        if self.last_running_summary.elapsed() < self.options.running_summary_interval {
            return;
        }
        self.last_running_summary = Instant::now();

        let running = self.job.running_ids();
        info!(count = running.len(), "currently running steps");
        let now = Utc::now();
        for id in running {
            if let Some(step) = self.job.step(&id) {
                let elapsed = step
                    .started_at
                    .map(|t| (now - t).num_seconds())
                    .unwrap_or_default();
                info!(step = %id, name = %step.name, pid = step.pid, elapsed_secs = elapsed, "running");
            }
        }
    }
}
