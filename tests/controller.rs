// tests/controller.rs

mod common;

use std::time::Duration;

use tokio::sync::mpsc;

use jobctl::config::MailSettings;
use jobctl::dag::{InternalTask, StepSpec, StepStatus};
use jobctl::engine::{ControlEvent, JobController, JobOutcome};
use jobctl::exec::SPAWN_FAILURE_CODE;
use jobctl::notify::MailMessage;
use jobctl_test_utils::builders::{JobConfigBuilder, StepConfigBuilder};
use jobctl_test_utils::{RecordingNotifier, ScriptedProcessBackend, init_tracing, with_timeout};

use common::{fast_options, job, run_to_end};

fn chain() -> Vec<StepSpec> {
    vec![
        StepSpec::process("A", "./a.sh"),
        StepSpec::process("B", "./b.sh").after(["A"]),
        StepSpec::process("C", "./c.sh").after(["B"]),
    ]
}

#[tokio::test]
async fn chain_runs_in_dependency_order() {
    init_tracing();

    let backend = ScriptedProcessBackend::new().default_script(0, 2);
    let spawned = backend.spawned_handle();
    let mut controller =
        JobController::new(job(chain(), 2), backend, RecordingNotifier::new(), fast_options());

    assert_eq!(run_to_end(&mut controller).await, JobOutcome::Finished);

    let job = controller.job();
    assert!(job.is_success());
    assert_eq!(job.completed(), ["A", "B", "C"].map(String::from).as_slice());
    assert_eq!(*spawned.lock().unwrap(), ["A", "B", "C"].map(String::from));
    assert!(job.stop_time.is_some());
    assert!(job.step("C").unwrap().pid.is_some());
}

#[tokio::test]
async fn failed_root_cancels_chain_without_spawning_it() {
    init_tracing();

    let backend = ScriptedProcessBackend::new().exit_with("A", 1);
    let spawned = backend.spawned_handle();
    let mut controller =
        JobController::new(job(chain(), 2), backend, RecordingNotifier::new(), fast_options());

    assert_eq!(run_to_end(&mut controller).await, JobOutcome::Finished);

    let job = controller.job();
    assert_eq!(job.status_of("A"), Some(StepStatus::Failed));
    assert_eq!(job.canceled(), ["B", "C"].map(String::from));
    assert!(!job.is_success());
    assert_eq!(*spawned.lock().unwrap(), vec!["A".to_string()]);
}

#[tokio::test]
async fn spawn_failure_fails_the_step() {
    init_tracing();

    let backend = ScriptedProcessBackend::new().fail_spawn("A");
    let mut controller =
        JobController::new(job(chain(), 1), backend, RecordingNotifier::new(), fast_options());

    run_to_end(&mut controller).await;

    let a = controller.job().step("A").unwrap();
    assert_eq!(a.status(), StepStatus::Failed);
    assert_eq!(a.result_code, Some(SPAWN_FAILURE_CODE));
    assert_eq!(controller.job().canceled().len(), 2);
}

#[tokio::test]
async fn running_count_never_exceeds_the_limit() {
    init_tracing();

    let steps = (0..6).map(|i| StepSpec::process(format!("s{i}"), "true"));
    let backend = ScriptedProcessBackend::new().default_script(0, 3);
    let mut controller =
        JobController::new(job(steps, 2), backend, RecordingNotifier::new(), fast_options());

    let mut peak = 0;
    while !controller.job().is_done() {
        controller.step_once().await.unwrap();
        let running = controller.job().running_count();
        assert!(running <= 2, "running = {running}");
        peak = peak.max(running);
    }
    assert_eq!(peak, 2);
    assert!(controller.job().is_success());
}

#[tokio::test]
async fn disabled_step_is_simulated() {
    init_tracing();

    let cfg = JobConfigBuilder::new()
        .with_step("E", StepConfigBuilder::os("./e.sh").build())
        .with_step("F", StepConfigBuilder::os("./f.sh").enabled(false).build())
        .build();
    let backend = ScriptedProcessBackend::new();
    let spawned = backend.spawned_handle();
    let job = jobctl::engine::Job::from_config(&cfg).unwrap();
    let mut controller = JobController::new(job, backend, RecordingNotifier::new(), fast_options());

    run_to_end(&mut controller).await;

    let f = controller.job().step("F").unwrap();
    assert_eq!(f.status(), StepStatus::Complete);
    assert_eq!(f.result_code, Some(0));
    assert!(f.simulate);
    assert!(f.pid.is_none());
    assert_eq!(*spawned.lock().unwrap(), vec!["E".to_string()]);
}

fn mail_step(id: &str) -> StepSpec {
    StepSpec::internal(
        id,
        InternalTask::SendMail(MailMessage {
            from: "job@example.com".into(),
            to: vec!["ops@example.com".into()],
            subject: "loaded".into(),
            body: "all rows loaded".into(),
        }),
    )
}

#[tokio::test]
async fn internal_tasks_run_on_the_loop() {
    init_tracing();

    let steps = [
        StepSpec::internal(
            "pause",
            InternalTask::Sleep {
                duration: Duration::from_millis(5),
            },
        ),
        mail_step("mail").after(["pause"]),
    ];
    let notifier = RecordingNotifier::new();
    let mut controller = JobController::new(
        job(steps, 1),
        ScriptedProcessBackend::new(),
        notifier.clone(),
        fast_options(),
    );

    run_to_end(&mut controller).await;

    assert!(controller.job().is_success());
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "loaded");
}

#[tokio::test]
async fn failed_mail_delivery_fails_the_step() {
    init_tracing();

    let mut controller = JobController::new(
        job([mail_step("mail")], 1),
        ScriptedProcessBackend::new(),
        RecordingNotifier::failing(),
        fast_options(),
    );

    run_to_end(&mut controller).await;

    let step = controller.job().step("mail").unwrap();
    assert_eq!(step.status(), StepStatus::Failed);
    assert_eq!(step.result_code, Some(1));
}

#[tokio::test]
async fn cancel_job_aborts_running_steps() {
    init_tracing();

    let steps = [
        StepSpec::process("A", "sleep 100"),
        StepSpec::process("B", "sleep 100"),
        StepSpec::process("C", "true").after(["A"]),
    ];
    let backend = ScriptedProcessBackend::new().default_script(0, usize::MAX);
    let killed = backend.killed_handle();
    let mut controller =
        JobController::new(job(steps, 2), backend, RecordingNotifier::new(), fast_options());

    controller.step_once().await.unwrap();
    assert_eq!(controller.job().running_count(), 2);

    let aborted = controller.cancel_job().unwrap();
    assert_eq!(aborted, ["A", "B"].map(String::from));
    assert_eq!(*killed.lock().unwrap(), ["A", "B"].map(String::from));

    let job = controller.job();
    assert_eq!(job.aborted(), ["A", "B"].map(String::from));
    assert_eq!(job.canceled(), vec!["C".to_string()]);
    assert!(job.is_done());
}

#[tokio::test]
async fn cancel_request_ends_the_run() {
    init_tracing();

    let steps = [
        StepSpec::process("A", "sleep 100"),
        StepSpec::process("B", "true").after(["A"]),
    ];
    let backend = ScriptedProcessBackend::new().default_script(0, usize::MAX);
    let mut controller =
        JobController::new(job(steps, 1), backend, RecordingNotifier::new(), fast_options());

    let (tx, mut rx) = mpsc::channel::<ControlEvent>(1);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        let _ = tx.send(ControlEvent::CancelRequested).await;
    });

    let outcome = with_timeout(controller.run(&mut rx)).await.unwrap();
    assert_eq!(outcome, JobOutcome::Canceled);

    let job = controller.job();
    assert_eq!(job.aborted(), vec!["A".to_string()]);
    assert_eq!(job.canceled(), vec!["B".to_string()]);
    assert!(job.stop_time.is_some());
}

#[test]
fn mail_settings_default_sender() {
    let cfg = JobConfigBuilder::new()
        .with_step("A", StepConfigBuilder::os("true").build())
        .mail_to("ops@example.com, dba@example.com")
        .build();

    assert_eq!(
        cfg.mail,
        MailSettings {
            from: "testhost@example.com".into(),
            to: vec!["ops@example.com".into(), "dba@example.com".into()],
            to_fail: vec![],
            smtp_relay: "localhost".into(),
        }
    );
}
