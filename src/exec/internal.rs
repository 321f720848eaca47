// src/exec/internal.rs

//! Built-in tasks executed directly on the control loop.

use tracing::{info, warn};

use crate::dag::{InternalTask, StepId};
use crate::notify::Notifier;

/// Run an internal task to completion and return its result code.
///
/// Both tasks hold the control loop for their whole duration: nothing else
/// is admitted or polled until they return.
pub async fn run_internal(step: &StepId, task: &InternalTask, notifier: &mut dyn Notifier) -> i32 {
    match task {
        InternalTask::Sleep { duration } => {
            info!(step = %step, seconds = duration.as_secs_f64(), "sleeping");
            tokio::time::sleep(*duration).await;
            0
        }
        InternalTask::SendMail(message) => {
            info!(step = %step, recipients = ?message.to, "sending mail");
            match notifier.send(message).await {
                Ok(()) => 0,
                Err(err) => {
                    warn!(step = %step, error = %err, "mail delivery failed");
                    1
                }
            }
        }
    }
}
