// src/config/loader.rs

use std::fs;
use std::path::Path;

use chrono::{DateTime, Local};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::model::{JobConfig, RawJobConfig};
use crate::config::template::{HostInfo, default_variables, merge_variables, substitute};
use crate::errors::{JobError, Result};

/// On-disk syntax of a job file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// `.toml` files are TOML; everything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }

    fn parse_value(self, text: &str) -> Result<Value> {
        Ok(match self {
            ConfigFormat::Json => serde_json::from_str(text)?,
            ConfigFormat::Toml => toml::from_str(text)?,
        })
    }

    fn parse_raw(self, text: &str) -> Result<RawJobConfig> {
        Ok(match self {
            ConfigFormat::Json => serde_json::from_str(text)?,
            ConfigFormat::Toml => toml::from_str(text)?,
        })
    }
}

/// Command-line overrides applied while loading.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Extra variables; win over the file's own `variables`.
    pub extras: Map<String, Value>,
    /// Step ids to simulate instead of run.
    pub disabled: Vec<String>,
    /// Simulate every step.
    pub simulate: bool,
    /// Replaces `mail_to`.
    pub email: Option<String>,
    /// Job start time used for the date variables.
    pub start_time: DateTime<Local>,
    pub host: HostInfo,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            extras: Map::new(),
            disabled: Vec::new(),
            simulate: false,
            email: None,
            start_time: Local::now(),
            host: HostInfo::detect(),
        }
    }
}

/// Parse a job file's text into a [`RawJobConfig`] with all variables merged
/// and substituted.
///
/// Variable precedence: built-in defaults, then the file's `variables`, then
/// `opts.extras` and `opts.email`. Substitution is applied to the whole
/// text, so any string in the file may reference a variable.
pub fn load_from_str(
    text: &str,
    config_file: &str,
    format: ConfigFormat,
    opts: &LoadOptions,
) -> Result<RawJobConfig> {
    let defaults = default_variables(config_file, opts.start_time, &opts.host);
    let overrides = override_variables(opts);

    // First pass: only the variables section is needed.
    let first = format.parse_value(text)?;
    let file_vars = first
        .get("variables")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let vars = merge_variables([&defaults, &file_vars, &overrides]);

    let substituted = substitute(text, &vars);
    let mut raw = format.parse_raw(&substituted)?;

    raw.variables = merge_variables([&defaults, &raw.variables, &overrides]);
    debug!(config_file, steps = raw.steps.len(), "job file parsed");
    Ok(raw)
}

/// Read and parse a job file. The format follows the file extension.
pub fn load_from_path(path: impl AsRef<Path>, opts: &LoadOptions) -> Result<RawJobConfig> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    load_from_str(&text, &config_file_name(path), ConfigFormat::from_path(path), opts)
}

/// Parse, validate and apply the step overrides in `opts`.
pub fn parse_and_validate(
    text: &str,
    config_file: &str,
    format: ConfigFormat,
    opts: &LoadOptions,
) -> Result<JobConfig> {
    let raw = load_from_str(text, config_file, format, opts)?;
    finish(raw, opts)
}

/// Recommended entry point: read the file at `path`, validate it into a
/// [`JobConfig`] and apply `--disabled` / `--simulate`.
pub fn load_and_validate(path: impl AsRef<Path>, opts: &LoadOptions) -> Result<JobConfig> {
    let raw = load_from_path(path, opts)?;
    finish(raw, opts)
}

/// Parse a JSON object of extra variables (`--extras` / `--extras-file`).
pub fn parse_extras(text: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        other => Err(JobError::ConfigError(format!(
            "extras must be a JSON object (got {other})"
        ))),
    }
}

fn finish(raw: RawJobConfig, opts: &LoadOptions) -> Result<JobConfig> {
    let mut cfg = JobConfig::try_from(raw)?;

    let unknown = cfg.disable_steps(opts.disabled.iter().map(String::as_str));
    if !unknown.is_empty() {
        return Err(JobError::ConfigError(format!(
            "cannot disable unknown step(s): {}",
            unknown.join(", ")
        )));
    }
    if opts.simulate {
        cfg.simulate_all();
    }
    Ok(cfg)
}

fn override_variables(opts: &LoadOptions) -> Map<String, Value> {
    let mut vars = opts.extras.clone();
    if let Some(email) = &opts.email {
        vars.insert("mail_to".to_string(), Value::from(email.as_str()));
    }
    vars
}

fn config_file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
