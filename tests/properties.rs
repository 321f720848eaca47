// tests/properties.rs

mod common;

use std::collections::BTreeSet;

use proptest::prelude::*;

use jobctl::dag::{StepSpec, StepStatus};
use jobctl::engine::Job;

use common::job;

/// Random acyclic jobs: step `i` may only depend on steps `0..i`.
fn dag_strategy(max_steps: usize) -> impl Strategy<Value = Vec<StepSpec>> {
    (1..=max_steps).prop_flat_map(|n| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..3), n).prop_map(
            |raw_deps| {
                raw_deps
                    .into_iter()
                    .enumerate()
                    .map(|(i, potential)| {
                        let deps: BTreeSet<String> = if i == 0 {
                            BTreeSet::new()
                        } else {
                            potential.into_iter().map(|d| format!("s{:02}", d % i)).collect()
                        };
                        StepSpec::process(format!("s{i:02}"), "true").after(deps)
                    })
                    .collect()
            },
        )
    })
}

/// Drive the job by hand, completing the lowest running id each round.
/// Returns the peak running count.
fn drive(job: &mut Job, failing: &BTreeSet<String>) -> usize {
    let mut peak = 0;
    while !job.is_done() {
        job.queue_runnables();
        while let Some(id) = job.start_next_queued().unwrap() {
            let deps = job.step(&id).unwrap().dependencies().clone();
            assert!(deps.iter().all(|d| job.completed().contains(d)), "{id} started early");
            peak = peak.max(job.running_count());
            assert!(job.running_count() <= job.concurrency_limit());
        }
        if let Some(id) = job.running_ids().into_iter().next() {
            let code = if failing.contains(&id) { 1 } else { 0 };
            job.complete_step(&id, code).unwrap();
        }
    }
    peak
}

proptest! {
    #[test]
    fn concurrency_ceiling_holds(
        steps in dag_strategy(12),
        limit in 1usize..4,
    ) {
        let mut job = job(steps, limit);
        let peak = drive(&mut job, &BTreeSet::new());
        prop_assert!(peak <= limit);
        prop_assert!(job.is_success());
    }

    #[test]
    fn only_descendants_of_failures_are_canceled(
        steps in dag_strategy(12),
        failing in proptest::collection::btree_set(0usize..12, 0..4),
        limit in 1usize..4,
    ) {
        let failing: BTreeSet<String> = failing.into_iter().map(|i| format!("s{i:02}")).collect();
        let mut job = job(steps, limit);
        drive(&mut job, &failing);

        let failed: Vec<String> = job.failed().to_vec();
        let mut downstream = BTreeSet::new();
        for f in &failed {
            downstream.extend(job.graph().descendants(f));
        }

        for step in job.steps() {
            let canceled = step.status() == StepStatus::Canceled;
            prop_assert_eq!(canceled, downstream.contains(&step.id), "step {}", step.id);
        }
        prop_assert_eq!(
            job.completed().len() + job.failed().len() + job.canceled().len(),
            job.len()
        );
    }
}
