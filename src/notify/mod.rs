// src/notify/mod.rs

//! Mail notifications.
//!
//! - [`Notifier`] abstracts delivery so tests can record messages instead of
//!   talking to a relay.
//! - [`smtp`] holds the production implementation.
//! - [`summary_mail`] composes the end-of-job summary message.

pub mod smtp;

use std::future::Future;
use std::pin::Pin;

use chrono::Utc;

use crate::config::model::MailSettings;
use crate::engine::summary::JobSummary;
use crate::errors::Result;

pub use smtp::SmtpNotifier;

/// A plain-text mail message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl MailMessage {
    /// Render headers and body as an RFC 5322 message with CRLF line endings.
    pub fn to_rfc5322(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("From: {}\r\n", self.from));
        out.push_str(&format!("To: {}\r\n", self.to.join(", ")));
        out.push_str(&format!("Subject: {}\r\n", self.subject));
        out.push_str(&format!("Date: {}\r\n", Utc::now().to_rfc2822()));
        out.push_str("MIME-Version: 1.0\r\n");
        out.push_str("Content-Type: text/plain; charset=utf-8\r\n");
        out.push_str("\r\n");
        for line in self.body.lines() {
            out.push_str(line);
            out.push_str("\r\n");
        }
        out
    }
}

/// Trait abstracting how mail is delivered.
///
/// Production code uses [`SmtpNotifier`]; tests can provide an
/// implementation that records messages or fails on demand.
pub trait Notifier: Send {
    fn send<'a>(
        &'a mut self,
        message: &'a MailMessage,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Compose the summary mail for a finished (or canceled) job.
///
/// Returns `None` when no recipients are configured.
pub fn summary_mail(
    summary: &JobSummary,
    mail: &MailSettings,
    hostname: &str,
    config_file: &str,
) -> Option<MailMessage> {
    let success = summary.is_success();
    let mut to = mail.to.clone();
    if !success {
        for extra in &mail.to_fail {
            if !to.contains(extra) {
                to.push(extra.clone());
            }
        }
    }
    if to.is_empty() {
        return None;
    }

    let status = if success { "SUCCESS" } else { "FAILURE" };
    Some(MailMessage {
        from: mail.from.clone(),
        to,
        subject: format!("{hostname} : Job {config_file} completed with {status}"),
        body: summary.render(),
    })
}
