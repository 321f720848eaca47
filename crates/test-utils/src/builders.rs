#![allow(dead_code)]

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use jobctl::config::{DependencySpec, JobConfig, RawJobConfig, StepConfig};
use jobctl::types::StepType;

/// Builder for `JobConfig` to simplify test setup.
///
/// Starts from the variables a loaded job file would carry
/// (`concurrency = 2`, `hostname = testhost`, no mail recipients).
pub struct JobConfigBuilder {
    config: RawJobConfig,
}

impl JobConfigBuilder {
    pub fn new() -> Self {
        let mut variables = Map::new();
        variables.insert("concurrency".into(), json!(2));
        variables.insert("config_file".into(), json!("test.json"));
        variables.insert("hostname".into(), json!("testhost"));
        variables.insert("hostname_fqdn".into(), json!("testhost.example.com"));
        variables.insert("mail_from_domain".into(), json!("example.com"));
        variables.insert("mail_from".into(), json!(""));
        variables.insert("mail_to".into(), json!(""));
        variables.insert("mail_to_fail".into(), json!(""));
        variables.insert("smtp_relay".into(), json!("localhost"));

        Self {
            config: RawJobConfig {
                variables,
                steps: BTreeMap::new(),
            },
        }
    }

    pub fn with_step(mut self, id: &str, step: StepConfig) -> Self {
        self.config.steps.insert(id.to_string(), step);
        self
    }

    pub fn with_variable(mut self, key: &str, value: Value) -> Self {
        self.config.variables.insert(key.to_string(), value);
        self
    }

    pub fn concurrency(self, n: usize) -> Self {
        self.with_variable("concurrency", json!(n))
    }

    pub fn mail_to(self, to: &str) -> Self {
        self.with_variable("mail_to", json!(to))
    }

    pub fn mail_to_fail(self, to: &str) -> Self {
        self.with_variable("mail_to_fail", json!(to))
    }

    pub fn raw(self) -> RawJobConfig {
        self.config
    }

    pub fn build(self) -> JobConfig {
        JobConfig::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for JobConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `StepConfig`.
pub struct StepConfigBuilder {
    step: StepConfig,
}

impl StepConfigBuilder {
    /// An `os` step running `cmd`.
    pub fn os(cmd: &str) -> Self {
        Self::with_type(StepType::Os, cmd)
    }

    /// `internal` sleep step.
    pub fn sleep(seconds: f64) -> Self {
        Self::with_type(StepType::Internal, "sleep").detail(json!({ "seconds": seconds }))
    }

    /// `internal` send_mail step.
    pub fn send_mail(to: &str, subject: &str, body: &str) -> Self {
        Self::with_type(StepType::Internal, "send_mail").detail(json!({
            "mail_to": to,
            "mail_subject": subject,
            "mail_body": body,
        }))
    }

    pub fn with_type(step_type: StepType, task: &str) -> Self {
        Self {
            step: StepConfig {
                name: None,
                step_type,
                task: task.to_string(),
                detail: None,
                dependencies: None,
                enabled: true,
                resultcode_allowed: None,
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.step.name = Some(name.to_string());
        self
    }

    pub fn detail(mut self, detail: Value) -> Self {
        self.step.detail = Some(detail);
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        match &mut self.step.dependencies {
            Some(DependencySpec::List(deps)) => deps.push(dep.to_string()),
            _ => self.step.dependencies = Some(DependencySpec::List(vec![dep.to_string()])),
        }
        self
    }

    pub fn after_all(mut self) -> Self {
        self.step.dependencies = Some(DependencySpec::Keyword("ALL".to_string()));
        self
    }

    pub fn dependency_keyword(mut self, keyword: &str) -> Self {
        self.step.dependencies = Some(DependencySpec::Keyword(keyword.to_string()));
        self
    }

    pub fn enabled(mut self, val: bool) -> Self {
        self.step.enabled = val;
        self
    }

    pub fn allowed_codes(mut self, codes: &[i32]) -> Self {
        self.step.resultcode_allowed = Some(codes.to_vec());
        self
    }

    pub fn build(self) -> StepConfig {
        self.step
    }
}
