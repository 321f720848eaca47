// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod notify;
pub mod types;

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::cli::CliArgs;
use crate::config::{JobConfig, LoadOptions, load_and_validate, parse_extras};
use crate::dag::Dependencies;
use crate::engine::{
    ControlEvent, ControllerOptions, Job, JobController, JobOutcome, JobSnapshot, JobSummary,
};
use crate::exec::OsProcessBackend;
use crate::notify::{Notifier, SmtpNotifier, summary_mail};
use crate::types::JobExitCode;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - job file loading and validation
/// - the controller with the OS process backend and SMTP notifier
/// - Ctrl-C handling
/// - snapshot, printed summary and summary mail
pub async fn run(args: CliArgs) -> Result<JobExitCode> {
    let config_path = args.config_path();
    let opts = load_options(&args)?;
    let cfg = load_and_validate(&config_path, &opts)
        .with_context(|| format!("failed to load job file {}", config_path.display()))?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(JobExitCode::Success);
    }

    let job = Job::from_config(&cfg)?;
    fs::create_dir_all(&args.log_path)
        .with_context(|| format!("failed to create log path {}", args.log_path.display()))?;

    let backend = OsProcessBackend::new(&args.log_path, cfg.config_stem());
    let notifier = SmtpNotifier::new(cfg.mail.smtp_relay.clone(), cfg.hostname.clone());
    let options = ControllerOptions {
        poll_interval: Duration::try_from_secs_f64(args.delay)
            .map_err(|_| anyhow!("--delay must be a non-negative number (got {})", args.delay))?,
        running_summary_interval: Duration::from_secs(args.running_delay),
    };

    // Ctrl-C -> cancel request.
    let (tx, mut rx) = mpsc::channel::<ControlEvent>(4);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            return;
        }
        let _ = tx.send(ControlEvent::CancelRequested).await;
    });

    let mut controller = JobController::new(job, backend, notifier, options);
    let result = controller.run(&mut rx).await;

    // Reports are written even when the loop bailed out with an error.
    let summary = report_job(
        controller.job(),
        &config_path.display().to_string(),
        &args.log_path,
        cfg.config_stem(),
    );
    print!("{}", summary.render());

    let outcome = result?;
    let exit = match outcome {
        JobOutcome::Canceled => JobExitCode::Canceled,
        JobOutcome::Finished if summary.is_success() => JobExitCode::Success,
        JobOutcome::Finished => JobExitCode::StepFailure,
    };

    let wants_mail = exit != JobExitCode::Success || !args.no_success_email;
    if wants_mail {
        if let Err(err) = send_summary(controller.notifier_mut(), &summary, &cfg).await {
            error!(error = %err, "summary mail could not be delivered");
            return Ok(JobExitCode::NotificationFailure);
        }
    }

    info!(exit_code = exit.code(), "done");
    Ok(exit)
}

fn load_options(args: &CliArgs) -> Result<LoadOptions> {
    let mut extras = Map::<String, Value>::new();
    if let Some(path) = &args.extras_file {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read extras file {}", path.display()))?;
        extras.extend(parse_extras(&text)?);
    }
    if let Some(text) = &args.extras {
        extras.extend(parse_extras(text)?);
    }

    Ok(LoadOptions {
        extras,
        disabled: args.disabled.clone(),
        simulate: args.simulate,
        email: args.email.clone(),
        ..LoadOptions::default()
    })
}

/// Write `<stem>.snapshot.json` and `<stem>.log.json` under `log_path` and
/// return the summary of `job` in whatever state it reached.
///
/// Write failures are logged, never returned.
pub fn report_job(job: &Job, label: &str, log_path: &Path, stem: &str) -> JobSummary {
    let snapshot_path = log_path.join(format!("{stem}.snapshot.json"));
    match JobSnapshot::from_job(job).save(&snapshot_path) {
        Ok(()) => debug!(path = %snapshot_path.display(), "snapshot written"),
        Err(err) => warn!(path = %snapshot_path.display(), error = %err, "failed to write snapshot"),
    }

    let summary = JobSummary::from_job(job, label, log_path.display().to_string());
    let log_json = log_path.join(format!("{stem}.log.json"));
    if let Err(err) = summary.save_json(&log_json) {
        warn!(path = %log_json.display(), error = %err, "failed to write job log");
    }
    summary
}

async fn send_summary<N: Notifier>(
    notifier: &mut N,
    summary: &JobSummary,
    cfg: &JobConfig,
) -> errors::Result<()> {
    let Some(message) = summary_mail(summary, &cfg.mail, &cfg.hostname, &cfg.config_file) else {
        warn!("no summary mail recipients configured; skipping summary mail");
        return Ok(());
    };
    info!(recipients = ?message.to, subject = %message.subject, "sending summary mail");
    notifier.send(&message).await
}

/// Simple dry-run output: print variables and the resolved step table.
fn print_dry_run(cfg: &JobConfig) {
    println!("jobctl dry-run");
    println!("  config_file = {}", cfg.config_file);
    println!("  concurrency = {}", cfg.concurrency);
    println!("  mail.from   = {}", cfg.mail.from);
    println!("  mail.to     = {}", cfg.mail.to.join(","));
    println!();

    println!("variables ({}):", cfg.variables.len());
    for (k, v) in &cfg.variables {
        println!("  {k} = {}", config::model::variable_as_string(v));
    }
    println!();

    println!("steps ({}):", cfg.steps.len());
    for (id, spec) in &cfg.steps {
        println!("  - {id}");
        if spec.name != *id {
            println!("      name: {}", spec.name);
        }
        println!("      {}", spec.kind);
        match &spec.dependencies {
            Dependencies::None => {}
            Dependencies::All => println!("      dependencies: ALL"),
            Dependencies::Ids(ids) => println!("      dependencies: {ids:?}"),
        }
        if spec.allowed_result_codes.len() != 1 || !spec.allowed_result_codes.contains(&0) {
            println!("      resultcode_allowed: {:?}", spec.allowed_result_codes);
        }
        if spec.simulate {
            println!("      simulated: true");
        }
    }

    debug!("dry-run complete (no execution)");
}
