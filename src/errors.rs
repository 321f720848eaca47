// src/errors.rs

//! Crate-wide error type and `Result` alias.

use thiserror::Error;

use crate::dag::StepStatus;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Configuration error: step '{step}' depends on unknown step '{dependency}'")]
    UnknownDependency { step: String, dependency: String },

    #[error("Cycle detected in step graph: {0}")]
    DagCycle(String),

    #[error("Step not found: {0}")]
    UnknownStep(String),

    #[error("Illegal status transition for step '{step}': {from} -> {to}")]
    InvalidTransition {
        step: String,
        from: StepStatus,
        to: StepStatus,
    },

    #[error("Failed to spawn process for step '{step}': {source}")]
    Spawn {
        step: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Notification delivery failed: {0}")]
    Notification(String),

    #[error("Job stalled; waiting steps can never become runnable: {0:?}")]
    Stalled(Vec<String>),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl JobError {
    /// Whether this error should be reported as a configuration problem
    /// (fatal before any step runs).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            JobError::ConfigError(_)
                | JobError::UnknownDependency { .. }
                | JobError::DagCycle(_)
                | JobError::JsonError(_)
                | JobError::TomlError(_)
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, JobError>;
