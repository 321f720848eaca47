// tests/os_process.rs
//
// Runs real children through the OS process backend.

#![cfg(unix)]

mod common;

use std::fs;
use std::time::Duration;

use tempfile::tempdir;

use jobctl::dag::{StepSpec, StepStatus};
use jobctl::engine::{ControllerOptions, JobController};
use jobctl::exec::{OsProcessBackend, ProcessBackend, RunningProcess, SPAWN_FAILURE_CODE};
use jobctl_test_utils::{RecordingNotifier, init_tracing};

use common::{job, run_to_end};

fn options() -> ControllerOptions {
    ControllerOptions {
        poll_interval: Duration::from_millis(10),
        running_summary_interval: Duration::from_secs(3600),
    }
}

#[tokio::test]
async fn exit_codes_and_output_files() {
    init_tracing();
    let dir = tempdir().unwrap();
    let backend = OsProcessBackend::new(dir.path(), "nightly");

    let steps = [
        StepSpec::process("hello", "sh -c 'echo hello; echo oops 1>&2'"),
        StepSpec::process("warn", "sh -c 'exit 3'").with_allowed_codes([0, 3]),
        StepSpec::process("boom", "sh -c 'exit 5'").after(["hello"]),
        StepSpec::process("after_boom", "echo never").after(["boom"]),
    ];
    let mut controller =
        JobController::new(job(steps, 2), backend, RecordingNotifier::new(), options());

    run_to_end(&mut controller).await;
    let job = controller.job();

    let hello = job.step("hello").unwrap();
    assert_eq!(hello.status(), StepStatus::Complete);
    assert!(hello.pid.is_some());
    let out = fs::read_to_string(dir.path().join("nightly-hello.out")).unwrap();
    assert!(out.contains("hello"));
    assert!(out.contains("oops"));

    assert_eq!(job.step("warn").unwrap().result_code, Some(3));
    assert_eq!(job.status_of("warn"), Some(StepStatus::Complete));

    assert_eq!(job.step("boom").unwrap().result_code, Some(5));
    assert_eq!(job.status_of("boom"), Some(StepStatus::Failed));
    assert_eq!(job.status_of("after_boom"), Some(StepStatus::Canceled));
    assert!(!dir.path().join("nightly-after_boom.out").exists());
}

#[tokio::test]
async fn shell_metacharacters_reach_the_program_literally() {
    init_tracing();
    let dir = tempdir().unwrap();
    let backend = OsProcessBackend::new(dir.path(), "nightly");

    let steps = [
        StepSpec::process("semi", "echo a;b"),
        StepSpec::process("vars", "echo $HOME | cat > x"),
        StepSpec::process("quoted", r#"printf '%s|' "two words" three"#),
    ];
    let mut controller =
        JobController::new(job(steps, 3), backend, RecordingNotifier::new(), options());

    run_to_end(&mut controller).await;
    let job = controller.job();

    assert_eq!(job.status_of("semi"), Some(StepStatus::Complete));
    assert_eq!(job.step("semi").unwrap().result_code, Some(0));
    let out = |step: &str| fs::read_to_string(dir.path().join(format!("nightly-{step}.out"))).unwrap();
    assert_eq!(out("semi"), "a;b\n");
    assert_eq!(out("vars"), "$HOME | cat > x\n");
    assert!(!dir.path().join("x").exists());
    assert_eq!(out("quoted"), "two words|three|");
    assert!(job.is_success());
}

#[tokio::test]
async fn missing_program_fails_at_spawn() {
    init_tracing();
    let dir = tempdir().unwrap();
    let backend = OsProcessBackend::new(dir.path(), "nightly");

    let steps = [StepSpec::process("ghost", "/nonexistent/jobctl-no-such-program --flag")];
    let mut controller =
        JobController::new(job(steps, 1), backend, RecordingNotifier::new(), options());

    run_to_end(&mut controller).await;
    let ghost = controller.job().step("ghost").unwrap();
    assert_eq!(ghost.status(), StepStatus::Failed);
    assert_eq!(ghost.result_code, Some(SPAWN_FAILURE_CODE));
    assert!(ghost.pid.is_none());
}

#[tokio::test]
async fn empty_argv_is_a_spawn_error() {
    let dir = tempdir().unwrap();
    let mut backend = OsProcessBackend::new(dir.path(), "nightly");
    assert!(backend.spawn(&"empty".to_string(), &[]).is_err());
}

#[tokio::test]
async fn killed_child_reports_no_exit_code() {
    init_tracing();
    let dir = tempdir().unwrap();
    let mut backend = OsProcessBackend::new(dir.path(), "nightly");

    let argv = ["sleep".to_string(), "30".to_string()];
    let mut child = backend.spawn(&"slow".to_string(), &argv).unwrap();
    assert!(child.pid().is_some());
    assert_eq!(child.try_exit_code().unwrap(), None);

    child.kill().unwrap();
    let code = jobctl_test_utils::with_timeout(async {
        loop {
            if let Some(code) = child.try_exit_code().unwrap() {
                break code;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert_eq!(code, -1);
}
