// src/config/template.rs

//! Built-in job variables and `$name` / `${name}` substitution.

use std::borrow::Cow;
use std::sync::OnceLock;

use chrono::{DateTime, Local};
use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::config::model::variable_as_string;

/// Host names used for defaults and the summary mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub fqdn: String,
    pub short: String,
}

impl HostInfo {
    pub fn new(fqdn: impl Into<String>) -> Self {
        let fqdn = fqdn.into();
        let short = fqdn.split('.').next().unwrap_or_default().to_string();
        Self { fqdn, short }
    }

    /// Detect the local host name, falling back to `localhost`.
    pub fn detect() -> Self {
        let fqdn = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "localhost".to_string());
        Self::new(fqdn)
    }
}

/// Number of CPUs available to this process (at least 1).
pub fn detect_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Variables every job gets before its own `variables` section is applied.
pub fn default_variables(
    config_file: &str,
    start: DateTime<Local>,
    host: &HostInfo,
) -> Map<String, Value> {
    let mut vars = Map::new();
    let mut put = |k: &str, v: Value| {
        vars.insert(k.to_string(), v);
    };

    put("concurrency", Value::from(detect_cpus()));
    put("config_file", Value::from(config_file));
    put("date", Value::from(start.format("%Y_%m_%d").to_string()));
    put("date_time", Value::from(start.format("%Y%m%d_%H%M%S").to_string()));
    put("date_time_2", Value::from(start.format("%Y%m%d-%H%M%S").to_string()));
    put("date_time_3", Value::from(start.format("%Y%m%d%H%M%S").to_string()));
    put("date_time_4", Value::from(start.format("%Y-%m-%d %H:%M:%S").to_string()));
    put("date_time_friendly", Value::from(start.format("%c").to_string()));
    put("hostname", Value::from(host.short.as_str()));
    put("hostname_fqdn", Value::from(host.fqdn.as_str()));
    put("mail_from_domain", Value::from(""));
    put("mail_from", Value::from(""));
    put("mail_to", Value::from(""));
    put("mail_to_fail", Value::from(""));
    put("smtp_relay", Value::from("localhost"));

    vars
}

/// Merge variable layers; later layers win.
pub fn merge_variables<'a, I>(layers: I) -> Map<String, Value>
where
    I: IntoIterator<Item = &'a Map<String, Value>>,
{
    let mut merged = Map::new();
    for layer in layers {
        for (k, v) in layer {
            merged.insert(k.clone(), v.clone());
        }
    }
    merged
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$(?:(\$)|([_A-Za-z][_A-Za-z0-9]*)|\{([_A-Za-z][_A-Za-z0-9]*)\})")
            .expect("placeholder regex is valid")
    })
}

/// Replace `$name` and `${name}` with the matching variable.
///
/// `$$` yields a literal `$`. Unknown names are left as written.
pub fn substitute<'t>(text: &'t str, vars: &Map<String, Value>) -> Cow<'t, str> {
    placeholder_regex().replace_all(text, |caps: &Captures<'_>| {
        if caps.get(1).is_some() {
            return "$".to_string();
        }
        let name = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str());
        match name.and_then(|n| vars.get(n)) {
            Some(value) => variable_as_string(value),
            None => caps[0].to_string(),
        }
    })
}
