// src/config/validate.rs

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::config::model::{
    DependencySpec, JobConfig, MailSettings, RawJobConfig, StepConfig, split_recipients,
    variable_as_string,
};
use crate::dag::{
    Dependencies, InternalTask, StepGraph, StepId, StepKind, StepSpec, split_command_line,
};
use crate::errors::{JobError, Result};
use crate::notify::MailMessage;
use crate::types::{StepType, TaskType};

/// Keyword accepted in place of a dependency list.
pub const ALL_KEYWORD: &str = "ALL";

impl TryFrom<RawJobConfig> for JobConfig {
    type Error = JobError;

    fn try_from(raw: RawJobConfig) -> std::result::Result<Self, Self::Error> {
        ensure_has_steps(&raw)?;

        let vars = &raw.variables;
        let concurrency = concurrency_from(vars)?;
        let hostname = string_var(vars, "hostname");
        let mail = mail_settings(vars, &hostname);

        let mut steps = BTreeMap::new();
        for (id, cfg) in &raw.steps {
            steps.insert(id.clone(), step_spec(id, cfg, &mail)?);
        }

        let graph = StepGraph::build(&steps)?;
        graph.ensure_acyclic()?;

        Ok(JobConfig::new_unchecked(
            string_var(vars, "config_file"),
            hostname,
            concurrency,
            mail,
            raw.variables,
            steps,
        ))
    }
}

fn ensure_has_steps(raw: &RawJobConfig) -> Result<()> {
    if raw.steps.is_empty() {
        return Err(JobError::ConfigError(
            "job file must define at least one entry under `steps`".to_string(),
        ));
    }
    Ok(())
}

fn string_var(vars: &Map<String, Value>, key: &str) -> String {
    vars.get(key).map(variable_as_string).unwrap_or_default()
}

fn concurrency_from(vars: &Map<String, Value>) -> Result<usize> {
    let invalid = |v: &Value| {
        JobError::ConfigError(format!(
            "variable `concurrency` must be a positive integer (got {v})"
        ))
    };

    let Some(value) = vars.get("concurrency") else {
        return Err(JobError::ConfigError(
            "variable `concurrency` is not set".to_string(),
        ));
    };

    let n = match value {
        Value::Number(n) => n.as_u64().ok_or_else(|| invalid(value))?,
        Value::String(s) => s.trim().parse::<u64>().map_err(|_| invalid(value))?,
        _ => return Err(invalid(value)),
    };
    if n == 0 {
        return Err(invalid(value));
    }
    usize::try_from(n).map_err(|_| invalid(value))
}

fn mail_settings(vars: &Map<String, Value>, hostname: &str) -> MailSettings {
    let from = match string_var(vars, "mail_from") {
        s if s.trim().is_empty() => format!("{hostname}@{}", string_var(vars, "mail_from_domain")),
        s => s,
    };
    MailSettings {
        from,
        to: split_recipients(&string_var(vars, "mail_to")),
        to_fail: split_recipients(&string_var(vars, "mail_to_fail")),
        smtp_relay: string_var(vars, "smtp_relay"),
    }
}

fn step_spec(id: &StepId, cfg: &StepConfig, mail: &MailSettings) -> Result<StepSpec> {
    let kind = step_kind(id, cfg, mail)?;
    let dependencies = dependencies(id, cfg.dependencies.as_ref())?;

    let allowed_result_codes: BTreeSet<i32> = match &cfg.resultcode_allowed {
        None => BTreeSet::from([0]),
        Some(codes) if codes.is_empty() => {
            return Err(JobError::ConfigError(format!(
                "step '{id}': `resultcode_allowed` must not be empty"
            )));
        }
        Some(codes) => codes.iter().copied().collect(),
    };

    Ok(StepSpec {
        id: id.clone(),
        name: cfg.name.clone().unwrap_or_else(|| id.clone()),
        kind,
        dependencies,
        allowed_result_codes,
        simulate: !cfg.enabled,
    })
}

fn step_kind(id: &StepId, cfg: &StepConfig, mail: &MailSettings) -> Result<StepKind> {
    match cfg.step_type {
        StepType::Os => {
            let argv = split_command_line(&cfg.task).ok_or_else(|| {
                JobError::ConfigError(format!(
                    "step '{id}': `task` must be a non-empty command line with balanced quotes (got {:?})",
                    cfg.task
                ))
            })?;
            Ok(StepKind::Process { argv })
        }
        StepType::Internal => {
            let task = TaskType::from_str(&cfg.task)
                .map_err(|e| JobError::ConfigError(format!("step '{id}': {e}")))?;
            let detail = cfg.detail.as_ref();
            let internal = match task {
                TaskType::Sleep => sleep_task(id, detail)?,
                TaskType::SendMail => send_mail_task(id, detail, mail)?,
            };
            Ok(StepKind::Internal(internal))
        }
    }
}

fn sleep_task(id: &StepId, detail: Option<&Value>) -> Result<InternalTask> {
    let seconds = detail
        .and_then(|d| d.get("seconds"))
        .and_then(|s| match s {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .ok_or_else(|| {
            JobError::ConfigError(format!(
                "step '{id}': sleep requires a numeric `detail.seconds`"
            ))
        })?;

    let duration = Duration::try_from_secs_f64(seconds).map_err(|_| {
        JobError::ConfigError(format!(
            "step '{id}': `detail.seconds` must be >= 0 (got {seconds})"
        ))
    })?;
    Ok(InternalTask::Sleep { duration })
}

fn send_mail_task(id: &StepId, detail: Option<&Value>, mail: &MailSettings) -> Result<InternalTask> {
    let field = |key: &str| -> Result<String> {
        detail
            .and_then(|d| d.get(key))
            .map(variable_as_string)
            .ok_or_else(|| {
                JobError::ConfigError(format!("step '{id}': send_mail requires `detail.{key}`"))
            })
    };

    let to = split_recipients(&field("mail_to")?);
    if to.is_empty() {
        return Err(JobError::ConfigError(format!(
            "step '{id}': `detail.mail_to` has no recipients"
        )));
    }
    let from = field("mail_from")
        .ok()
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| mail.from.clone());

    Ok(InternalTask::SendMail(MailMessage {
        from,
        to,
        subject: field("mail_subject")?,
        body: field("mail_body")?,
    }))
}

fn dependencies(id: &StepId, spec: Option<&DependencySpec>) -> Result<Dependencies> {
    match spec {
        None => Ok(Dependencies::None),
        Some(DependencySpec::Keyword(k)) if k == ALL_KEYWORD => Ok(Dependencies::All),
        Some(DependencySpec::Keyword(k)) => Err(JobError::ConfigError(format!(
            "step '{id}': unknown dependency keyword '{k}' (expected \"{ALL_KEYWORD}\" or a list)"
        ))),
        Some(DependencySpec::List(ids)) => {
            if ids.iter().any(|dep| dep == id) {
                return Err(JobError::ConfigError(format!(
                    "step '{id}' cannot depend on itself"
                )));
            }
            if ids.is_empty() {
                return Ok(Dependencies::None);
            }
            Ok(Dependencies::Ids(ids.iter().cloned().collect()))
        }
    }
}
