// src/config/model.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dag::{StepId, StepSpec};
use crate::types::StepType;

/// Job file as read from disk, after variable substitution.
///
/// ```json
/// {
///   "variables": { "concurrency": 2, "mail_to": "ops@example.com" },
///   "steps": {
///     "extract": { "type": "os", "task": "./extract.sh $date" },
///     "load":    { "type": "os", "task": "./load.sh", "dependencies": ["extract"] },
///     "notify":  { "type": "internal", "task": "send_mail", "dependencies": "ALL",
///                  "detail": { "mail_to": "ops@example.com", "mail_subject": "done", "mail_body": "ok" } }
///   }
/// }
/// ```
///
/// TOML files use the same shape (`[variables]`, `[steps.<id>]`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawJobConfig {
    /// Free-form variables; merged with built-in defaults and CLI extras.
    #[serde(default)]
    pub variables: Map<String, Value>,

    /// Steps keyed by id.
    #[serde(default)]
    pub steps: BTreeMap<String, StepConfig>,
}

/// One entry under `steps`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Human readable label used in logs and the summary. Defaults to the id.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(rename = "type")]
    pub step_type: StepType,

    /// Command line for `os` steps, built-in task name for `internal` steps.
    pub task: String,

    /// Structured arguments for internal tasks.
    #[serde(default)]
    pub detail: Option<Value>,

    /// `null`/absent, the literal `"ALL"`, or a list of step ids.
    #[serde(default)]
    pub dependencies: Option<DependencySpec>,

    /// Disabled steps are simulated: they complete with code 0 without running.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Result codes treated as success. Defaults to `[0]`.
    #[serde(default)]
    pub resultcode_allowed: Option<Vec<i32>>,
}

fn default_enabled() -> bool {
    true
}

/// Raw form of the `dependencies` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencySpec {
    Keyword(String),
    List(Vec<String>),
}

/// Mail settings derived from the job variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailSettings {
    /// Sender; `mail_from`, or `<hostname>@<mail_from_domain>` when unset.
    pub from: String,
    /// Recipients of every summary mail.
    pub to: Vec<String>,
    /// Extra recipients added when the job did not succeed.
    pub to_fail: Vec<String>,
    /// SMTP relay (`host` or `host:port`).
    pub smtp_relay: String,
}

/// Validated job configuration.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// File name the job was loaded from (used for log and snapshot names).
    pub config_file: String,
    /// Short host name.
    pub hostname: String,
    /// Ceiling on simultaneously running steps.
    pub concurrency: usize,
    pub mail: MailSettings,
    /// Fully merged and substituted variables.
    pub variables: Map<String, Value>,
    pub steps: BTreeMap<StepId, StepSpec>,
}

impl JobConfig {
    /// Construct without validation. Prefer `JobConfig::try_from(raw)`.
    pub fn new_unchecked(
        config_file: String,
        hostname: String,
        concurrency: usize,
        mail: MailSettings,
        variables: Map<String, Value>,
        steps: BTreeMap<StepId, StepSpec>,
    ) -> Self {
        Self {
            config_file,
            hostname,
            concurrency,
            mail,
            variables,
            steps,
        }
    }

    /// File name without extension(s), e.g. `nightly` for `nightly.conf.json`.
    pub fn config_stem(&self) -> &str {
        self.config_file
            .split('.')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("job")
    }

    /// Mark the given steps as simulated. Unknown ids are returned.
    pub fn disable_steps<'a, I>(&mut self, ids: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut unknown = Vec::new();
        for id in ids {
            match self.steps.get_mut(id) {
                Some(spec) => spec.simulate = true,
                None => unknown.push(id.to_string()),
            }
        }
        unknown
    }

    /// Simulate every step.
    pub fn simulate_all(&mut self) {
        for spec in self.steps.values_mut() {
            spec.simulate = true;
        }
    }
}

/// Render a variable value the way it is spliced into the job file.
pub fn variable_as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Split a comma separated recipient list.
pub fn split_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
