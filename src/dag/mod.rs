// src/dag/mod.rs

//! Step graph and per-step state.
//!
//! - [`graph`] holds the dependency graph and answers child/descendant queries.
//! - [`status`] defines the step status vocabulary and legal transitions.
//! - [`step`] contains step definitions and the mutable per-step record.

pub mod graph;
pub mod status;
pub mod step;

pub use graph::StepGraph;
pub use status::StepStatus;
pub use step::{
    Dependencies, InternalTask, Step, StepId, StepKind, StepSpec, split_command_line,
};
