// tests/status.rs

use jobctl::dag::{Step, StepSpec, StepStatus};
use jobctl::errors::JobError;

use StepStatus::*;

const ALL: [StepStatus; 7] = [Waiting, Queued, Running, Complete, Failed, Canceled, Aborted];

#[test]
fn only_documented_transitions_are_legal() {
    let legal = [
        (Waiting, Queued),
        (Queued, Running),
        (Running, Complete),
        (Running, Failed),
        (Waiting, Canceled),
        (Queued, Canceled),
        (Running, Aborted),
    ];

    for from in ALL {
        for to in ALL {
            assert_eq!(
                from.can_transition_to(to),
                legal.contains(&(from, to)),
                "{from} -> {to}"
            );
        }
    }
}

#[test]
fn terminal_statuses_have_no_exits() {
    for from in ALL.into_iter().filter(|s| s.is_terminal()) {
        assert!(ALL.iter().all(|to| !from.can_transition_to(*to)), "{from}");
    }
    assert!(Waiting.is_runnable() && Queued.is_runnable());
    assert!(!Running.is_runnable() && Running.is_running());
}

#[test]
fn step_rejects_illegal_transition() {
    let spec = StepSpec::process("A", "true");
    let mut step = Step::new(&spec, Default::default());
    assert_eq!(step.status(), Waiting);

    let err = step.transition(Running).unwrap_err();
    match err {
        JobError::InvalidTransition { step, from, to } => {
            assert_eq!(step, "A");
            assert_eq!(from, Waiting);
            assert_eq!(to, Running);
        }
        other => panic!("expected InvalidTransition, got {other:?}"),
    }
    assert_eq!(step.status(), Waiting);

    step.transition(Queued).unwrap();
    step.transition(Running).unwrap();
    step.transition(Complete).unwrap();
    assert!(step.transition(Failed).is_err());
}

#[test]
fn status_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&Canceled).unwrap(), "\"canceled\"");
    assert_eq!(Aborted.to_string(), "aborted");
}
