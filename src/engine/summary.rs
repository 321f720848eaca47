// src/engine/summary.rs

//! Structured end-of-job summary consumed by reporting and notification.

use std::fs;
use std::path::Path;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::dag::{Step, StepId, StepStatus};
use crate::engine::job::Job;
use crate::errors::Result;

const SEP: &str = "*******************************************";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Per-step detail line in the summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepDetail {
    pub id: StepId,
    pub name: String,
    pub status: StepStatus,
    pub simulated: bool,
    pub result_code: Option<i32>,
    pub allowed_result_codes: Vec<i32>,
    pub pid: Option<u32>,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub duration_secs: Option<f64>,
}

impl StepDetail {
    fn from_step(step: &Step) -> Self {
        Self {
            id: step.id.clone(),
            name: step.name.clone(),
            status: step.status(),
            simulated: step.simulate,
            result_code: step.result_code,
            allowed_result_codes: step.allowed_result_codes.iter().copied().collect(),
            pid: step.pid,
            started_at: step.started_at,
            stopped_at: step.stopped_at,
            duration_secs: step.duration().map(secs),
        }
    }
}

/// Counts and per-step details for completed/failed/canceled/aborted steps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSummary {
    /// Where the job came from (config file path).
    pub job: String,
    /// Directory holding step output and the snapshot.
    pub log_path: String,
    pub start_time: DateTime<Utc>,
    pub stop_time: Option<DateTime<Utc>>,
    pub duration_secs: Option<f64>,
    pub total: usize,
    pub completed: Vec<StepDetail>,
    pub failed: Vec<StepDetail>,
    pub canceled: Vec<StepDetail>,
    pub aborted: Vec<StepDetail>,
}

impl JobSummary {
    pub fn from_job(job: &Job, label: impl Into<String>, log_path: impl Into<String>) -> Self {
        let details = |ids: &[StepId]| -> Vec<StepDetail> {
            ids.iter()
                .filter_map(|id| job.step(id))
                .map(StepDetail::from_step)
                .collect()
        };

        Self {
            job: label.into(),
            log_path: log_path.into(),
            start_time: job.start_time,
            stop_time: job.stop_time,
            duration_secs: job.duration().map(secs),
            total: job.len(),
            completed: details(job.completed()),
            failed: details(job.failed()),
            canceled: details(&job.canceled()),
            aborted: details(&job.aborted()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.completed.len() == self.total
    }

    /// Write the summary as pretty JSON (the machine readable job log).
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Plain-text report: per-step detail sections followed by the totals.
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = Vec::new();

        lines.push(SEP.to_string());
        lines.push("JOB DETAIL".to_string());
        lines.push(SEP.to_string());
        for (title, steps) in [
            ("Completed Steps:", &self.completed),
            ("Failed Steps:", &self.failed),
            ("Canceled Steps:", &self.canceled),
            ("Aborted Steps:", &self.aborted),
        ] {
            lines.push(title.to_string());
            if steps.is_empty() {
                lines.push("     None".to_string());
            }
            for d in steps {
                render_detail(&mut lines, d);
            }
            lines.push(SEP.to_string());
        }

        let mut completed_ids: Vec<&str> = self.completed.iter().map(|d| d.id.as_str()).collect();
        completed_ids.sort_unstable();

        lines.push(SEP.to_string());
        lines.push("JOB SUMMARY".to_string());
        lines.push(SEP.to_string());
        lines.push("Job:".to_string());
        lines.push(format!("    config file      {}", self.job));
        lines.push(format!("    log path         {}", self.log_path));
        lines.push(format!("    start:           {}", fmt_time(Some(self.start_time))));
        lines.push(format!("    stop:            {}", fmt_time(self.stop_time)));
        lines.push(format!("    duration:        {}", fmt_secs(self.duration_secs)));
        lines.push(format!("    steps total:     {}", self.total));
        lines.push(format!("    steps completed: {}", self.completed.len()));
        lines.push(format!("    steps failed:    {}", self.failed.len()));
        lines.push(format!("    steps canceled:  {}", self.canceled.len()));
        lines.push(format!("    steps aborted:   {}", self.aborted.len()));
        lines.push(format!("    completed steps: {}", completed_ids.join(",")));
        lines.push(SEP.to_string());

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

fn render_detail(lines: &mut Vec<String>, d: &StepDetail) {
    let sim = if d.simulated { " (simulated)" } else { "" };
    let code = d
        .result_code
        .map(|c| c.to_string())
        .unwrap_or_else(|| "-".to_string());
    lines.push(format!("Step: {}", d.id));
    lines.push(format!("     name:       {}", d.name));
    lines.push(format!("     status:     {}{}", d.status, sim));
    lines.push(format!("     detail:     {}", d.status.description()));
    lines.push(format!("     resultcode: {} (allowed: {:?})", code, d.allowed_result_codes));
    if let Some(pid) = d.pid {
        lines.push(format!("     pid:        {pid}"));
    }
    lines.push(format!("     start:      {}", fmt_time(d.started_at)));
    lines.push(format!("     stop:       {}", fmt_time(d.stopped_at)));
    lines.push(format!("     duration:   {}", fmt_secs(d.duration_secs)));
}

fn secs(d: TimeDelta) -> f64 {
    d.num_milliseconds() as f64 / 1000.0
}

fn fmt_time(t: Option<DateTime<Utc>>) -> String {
    t.map(|t| t.format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn fmt_secs(s: Option<f64>) -> String {
    s.map(|s| format!("{s:.3}s")).unwrap_or_else(|| "-".to_string())
}
