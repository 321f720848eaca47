// src/engine/snapshot.rs

//! Serializable snapshot of a job for persistence.
//!
//! Process handles are never part of the snapshot.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dag::{StepId, StepStatus};
use crate::engine::job::Job;
use crate::errors::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub id: StepId,
    pub name: String,
    /// Human readable kind, e.g. `os: ./load.sh`.
    pub kind: String,
    pub dependencies: Vec<StepId>,
    pub allowed_result_codes: Vec<i32>,
    pub status: StepStatus,
    pub simulate: bool,
    pub pid: Option<u32>,
    pub queued_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub duration_secs: Option<f64>,
    pub result_code: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub steps: Vec<StepRecord>,
    pub start_time: DateTime<Utc>,
    pub stop_time: Option<DateTime<Utc>>,
    pub duration_secs: Option<f64>,
    pub queue: Vec<StepId>,
    pub completed: Vec<StepId>,
    pub failed: Vec<StepId>,
    pub canceled: Vec<StepId>,
    pub aborted: Vec<StepId>,
}

impl JobSnapshot {
    pub fn from_job(job: &Job) -> Self {
        let steps = job
            .steps()
            .map(|s| StepRecord {
                id: s.id.clone(),
                name: s.name.clone(),
                kind: s.kind.to_string(),
                dependencies: s.dependencies().iter().cloned().collect(),
                allowed_result_codes: s.allowed_result_codes.iter().copied().collect(),
                status: s.status(),
                simulate: s.simulate,
                pid: s.pid,
                queued_at: s.queued_at,
                started_at: s.started_at,
                stopped_at: s.stopped_at,
                duration_secs: s.duration().map(|d| d.num_milliseconds() as f64 / 1000.0),
                result_code: s.result_code,
            })
            .collect();

        Self {
            steps,
            start_time: job.start_time,
            stop_time: job.stop_time,
            duration_secs: job
                .duration()
                .map(|d| d.num_milliseconds() as f64 / 1000.0),
            queue: job.queue().iter().cloned().collect(),
            completed: job.completed().to_vec(),
            failed: job.failed().to_vec(),
            canceled: job.canceled(),
            aborted: job.aborted(),
        }
    }

    /// Write as pretty JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}
