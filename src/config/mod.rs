// src/config/mod.rs

//! Job file loading and validation.
//!
//! - `model.rs`: serde data model of the JSON/TOML job file.
//! - `template.rs`: built-in variables and `$var` substitution.
//! - `loader.rs`: reads a file, merges variables, applies overrides.
//! - `validate.rs`: turns the raw model into typed step specs.

pub mod loader;
pub mod model;
pub mod template;
pub mod validate;

pub use loader::{
    ConfigFormat, LoadOptions, load_and_validate, load_from_path, load_from_str, parse_and_validate,
    parse_extras,
};
pub use model::{DependencySpec, JobConfig, MailSettings, RawJobConfig, StepConfig};
pub use template::HostInfo;
