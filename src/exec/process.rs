// src/exec/process.rs

//! OS-process backend.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::debug;

use crate::dag::StepId;
use crate::errors::{JobError, Result};
use crate::exec::backend::{ProcessBackend, RunningProcess};

/// Spawns step programs directly from their argument vector, writing
/// combined stdout/stderr to `<log_dir>/<job>-<step>.out`.
#[derive(Debug, Clone)]
pub struct OsProcessBackend {
    log_dir: PathBuf,
    job_stem: String,
}

impl OsProcessBackend {
    pub fn new(log_dir: impl Into<PathBuf>, job_stem: impl Into<String>) -> Self {
        Self {
            log_dir: log_dir.into(),
            job_stem: job_stem.into(),
        }
    }

    /// Path of the output file for `step`.
    pub fn output_path(&self, step: &str) -> PathBuf {
        self.log_dir.join(format!("{}-{}.out", self.job_stem, step))
    }
}

fn open_output(path: &Path) -> io::Result<(File, File)> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let out = File::create(path)?;
    let err = out.try_clone()?;
    Ok((out, err))
}

impl ProcessBackend for OsProcessBackend {
    fn spawn(&mut self, step: &StepId, argv: &[String]) -> Result<Box<dyn RunningProcess>> {
        let spawn_err = |source| JobError::Spawn {
            step: step.clone(),
            source,
        };

        let Some((program, args)) = argv.split_first() else {
            return Err(spawn_err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "empty argument vector",
            )));
        };

        let output = self.output_path(step);
        let (stdout, stderr) = open_output(&output).map_err(spawn_err)?;

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_err)?;

        debug!(step = %step, output = %output.display(), "step output redirected");

        Ok(Box::new(OsProcess {
            step: step.clone(),
            child,
            output,
        }))
    }
}

/// A running child. The parent's copies of the output file were handed to
/// the child at spawn; dropping this kills the child if still alive.
#[derive(Debug)]
struct OsProcess {
    step: StepId,
    child: Child,
    output: PathBuf,
}

impl RunningProcess for OsProcess {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    fn try_exit_code(&mut self) -> Result<Option<i32>> {
        match self.child.try_wait()? {
            Some(status) => {
                // Killed by a signal: no exit code.
                let code = status.code().unwrap_or(-1);
                debug!(
                    step = %self.step,
                    exit_code = code,
                    output = %self.output.display(),
                    "step process exited"
                );
                Ok(Some(code))
            }
            None => Ok(None),
        }
    }

    fn kill(&mut self) -> Result<()> {
        self.child.start_kill()?;
        Ok(())
    }
}
