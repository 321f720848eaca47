// src/exec/mod.rs

//! Step execution layer.
//!
//! - [`backend`] provides the `ProcessBackend` / `RunningProcess` traits the
//!   controller drives, so tests can swap in scripted fake children.
//! - [`process`] is the production OS-process backend built on
//!   `tokio::process::Command`, with liveness checked by non-blocking polls.
//! - [`internal`] runs the built-in `sleep` and `send_mail` tasks.

pub mod backend;
pub mod internal;
pub mod process;

pub use backend::{ProcessBackend, RunningProcess, SPAWN_FAILURE_CODE};
pub use internal::run_internal;
pub use process::OsProcessBackend;
