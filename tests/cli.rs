// tests/cli.rs

use std::path::PathBuf;

use clap::Parser;

use jobctl::cli::{CliArgs, MIN_RUNNING_DELAY_SECS};

#[test]
fn defaults_apply_when_only_the_job_file_is_given() {
    let args = CliArgs::try_parse_from(["jobctl", "--config", "nightly.json"]).unwrap();

    assert_eq!(args.delay, 1.0);
    assert_eq!(args.running_delay, 900);
    assert_eq!(args.log_path, PathBuf::from("logs"));
    assert_eq!(args.config_path(), PathBuf::from("./nightly.json"));
    assert!(args.disabled.is_empty());
    assert!(!args.simulate);
    assert!(!args.dry_run);
}

#[test]
fn running_delay_below_minimum_is_rejected() {
    let below = (MIN_RUNNING_DELAY_SECS - 1).to_string();
    let err = CliArgs::try_parse_from(["jobctl", "-c", "job.json", "--running-delay", &below])
        .unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);

    let args = CliArgs::try_parse_from([
        "jobctl",
        "-c",
        "job.json",
        "--running-delay",
        &MIN_RUNNING_DELAY_SECS.to_string(),
    ])
    .unwrap();
    assert_eq!(args.running_delay, MIN_RUNNING_DELAY_SECS);
}

#[test]
fn disabled_list_is_comma_separated() {
    let args = CliArgs::try_parse_from([
        "jobctl",
        "-c",
        "job.toml",
        "-p",
        "/etc/jobs",
        "--disabled",
        "a,b",
        "--disabled",
        "c",
    ])
    .unwrap();

    assert_eq!(args.disabled, ["a", "b", "c"]);
    assert_eq!(args.config_path(), PathBuf::from("/etc/jobs/job.toml"));
}

#[test]
fn job_file_is_required() {
    let err = CliArgs::try_parse_from(["jobctl"]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
}
