use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex};

use jobctl::dag::StepId;
use jobctl::errors::{JobError, Result};
use jobctl::exec::{ProcessBackend, RunningProcess};

/// How a fake child behaves: it reports `exit_code` after `polls` polls that
/// return "still running".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Script {
    pub exit_code: i32,
    pub polls: usize,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            exit_code: 0,
            polls: 0,
        }
    }
}

/// A fake process backend that:
/// - records which steps were spawned and killed
/// - hands out children whose exit codes and run lengths are scripted per step.
#[derive(Debug, Default)]
pub struct ScriptedProcessBackend {
    scripts: HashMap<String, Script>,
    default_script: Script,
    fail_spawn: HashSet<String>,
    spawned: Arc<Mutex<Vec<String>>>,
    killed: Arc<Mutex<Vec<String>>>,
    next_pid: u32,
}

impl ScriptedProcessBackend {
    pub fn new() -> Self {
        Self {
            next_pid: 1000,
            ..Self::default()
        }
    }

    /// Step exits with `code` on its first poll.
    pub fn exit_with(self, step: &str, code: i32) -> Self {
        self.script(step, code, 0)
    }

    /// Step reports "running" for `polls` polls, then exits with `code`.
    pub fn script(mut self, step: &str, code: i32, polls: usize) -> Self {
        self.scripts.insert(
            step.to_string(),
            Script {
                exit_code: code,
                polls,
            },
        );
        self
    }

    /// Behaviour for steps without an explicit script.
    pub fn default_script(mut self, code: i32, polls: usize) -> Self {
        self.default_script = Script {
            exit_code: code,
            polls,
        };
        self
    }

    /// `spawn` fails for this step.
    pub fn fail_spawn(mut self, step: &str) -> Self {
        self.fail_spawn.insert(step.to_string());
        self
    }

    pub fn spawned_handle(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.spawned)
    }

    pub fn killed_handle(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.killed)
    }
}

impl ProcessBackend for ScriptedProcessBackend {
    fn spawn(&mut self, step: &StepId, _argv: &[String]) -> Result<Box<dyn RunningProcess>> {
        if self.fail_spawn.contains(step) {
            return Err(JobError::Spawn {
                step: step.clone(),
                source: io::Error::new(io::ErrorKind::NotFound, "scripted spawn failure"),
            });
        }

        self.spawned.lock().unwrap().push(step.clone());
        self.next_pid += 1;

        let script = self
            .scripts
            .get(step)
            .copied()
            .unwrap_or(self.default_script);

        Ok(Box::new(FakeProcess {
            step: step.clone(),
            pid: self.next_pid,
            script,
            polls_left: script.polls,
            killed: Arc::clone(&self.killed),
        }))
    }
}

#[derive(Debug)]
struct FakeProcess {
    step: StepId,
    pid: u32,
    script: Script,
    polls_left: usize,
    killed: Arc<Mutex<Vec<String>>>,
}

impl RunningProcess for FakeProcess {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn try_exit_code(&mut self) -> Result<Option<i32>> {
        if self.polls_left == 0 {
            return Ok(Some(self.script.exit_code));
        }
        self.polls_left -= 1;
        Ok(None)
    }

    fn kill(&mut self) -> Result<()> {
        self.killed.lock().unwrap().push(self.step.clone());
        Ok(())
    }
}
