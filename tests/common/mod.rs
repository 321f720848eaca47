#![allow(dead_code)]

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::mpsc;

use jobctl::dag::{StepId, StepSpec};
use jobctl::engine::{ControlEvent, ControllerOptions, Job, JobController, JobOutcome};
use jobctl::exec::ProcessBackend;
use jobctl::notify::Notifier;
use jobctl_test_utils::with_timeout;

/// Key step specs by id.
pub fn specs<I: IntoIterator<Item = StepSpec>>(steps: I) -> BTreeMap<StepId, StepSpec> {
    steps.into_iter().map(|s| (s.id.clone(), s)).collect()
}

pub fn job<I: IntoIterator<Item = StepSpec>>(steps: I, limit: usize) -> Job {
    Job::new(&specs(steps), limit).expect("valid job")
}

/// Loop timing that keeps tests fast.
pub fn fast_options() -> ControllerOptions {
    ControllerOptions {
        poll_interval: Duration::from_millis(1),
        running_summary_interval: Duration::from_secs(3600),
    }
}

/// Drive the controller until the job is done, failing the test after 5s.
pub async fn run_to_end<P: ProcessBackend, N: Notifier>(
    controller: &mut JobController<P, N>,
) -> JobOutcome {
    let (_tx, mut rx) = mpsc::channel::<ControlEvent>(1);
    with_timeout(controller.run(&mut rx))
        .await
        .expect("controller run")
}
