// src/notify/smtp.rs

//! Minimal SMTP delivery to a relay (no auth, no TLS).

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::{debug, info};

use crate::errors::{JobError, Result};
use crate::notify::{MailMessage, Notifier};

const DEFAULT_PORT: u16 = 25;
const DIALOGUE_TIMEOUT: Duration = Duration::from_secs(60);

/// Delivers mail through an SMTP relay such as a local MTA.
#[derive(Debug, Clone)]
pub struct SmtpNotifier {
    relay: String,
    helo_name: String,
}

impl SmtpNotifier {
    /// `relay` is `host` or `host:port`; `helo_name` identifies this host.
    pub fn new(relay: impl Into<String>, helo_name: impl Into<String>) -> Self {
        Self {
            relay: relay.into(),
            helo_name: helo_name.into(),
        }
    }

    fn address(&self) -> String {
        if self.relay.contains(':') {
            self.relay.clone()
        } else {
            format!("{}:{}", self.relay, DEFAULT_PORT)
        }
    }

    async fn deliver(&self, message: &MailMessage) -> Result<()> {
        if message.to.is_empty() {
            return Err(JobError::Notification("message has no recipients".to_string()));
        }

        let addr = self.address();
        debug!(relay = %addr, "connecting to SMTP relay");
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| JobError::Notification(format!("connecting to {addr}: {e}")))?;
        let (read, write) = stream.into_split();
        let mut session = Session {
            reader: BufReader::new(read),
            writer: write,
        };

        session.expect(&[220]).await?;
        session.command(&format!("HELO {}", self.helo_name), &[250]).await?;
        session.command(&format!("MAIL FROM:<{}>", message.from), &[250]).await?;
        for rcpt in &message.to {
            session.command(&format!("RCPT TO:<{rcpt}>"), &[250, 251]).await?;
        }
        session.command("DATA", &[354]).await?;
        session.send_data(&message.to_rfc5322()).await?;
        session.expect(&[250]).await?;
        session.command("QUIT", &[221]).await?;

        info!(relay = %addr, recipients = ?message.to, subject = %message.subject, "mail sent");
        Ok(())
    }
}

impl Notifier for SmtpNotifier {
    fn send<'a>(
        &'a mut self,
        message: &'a MailMessage,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            match tokio::time::timeout(DIALOGUE_TIMEOUT, self.deliver(message)).await {
                Ok(res) => res,
                Err(_) => Err(JobError::Notification(format!(
                    "SMTP dialogue with {} timed out",
                    self.relay
                ))),
            }
        })
    }
}

struct Session {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Session {
    async fn command(&mut self, line: &str, accepted: &[u16]) -> Result<()> {
        self.write_line(line).await?;
        self.expect(accepted).await
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .map_err(|e| JobError::Notification(format!("writing to relay: {e}")))
    }

    /// Send the message body, dot-stuffed and terminated by `CRLF.CRLF`.
    async fn send_data(&mut self, data: &str) -> Result<()> {
        let mut out = String::with_capacity(data.len() + 8);
        for line in data.trim_end_matches("\r\n").split("\r\n") {
            if line.starts_with('.') {
                out.push('.');
            }
            out.push_str(line);
            out.push_str("\r\n");
        }
        out.push_str(".\r\n");
        self.writer
            .write_all(out.as_bytes())
            .await
            .map_err(|e| JobError::Notification(format!("writing message data: {e}")))
    }

    /// Read a (possibly multi-line) reply and check its code.
    async fn expect(&mut self, accepted: &[u16]) -> Result<()> {
        loop {
            let mut line = String::new();
            let n = self
                .reader
                .read_line(&mut line)
                .await
                .map_err(|e| JobError::Notification(format!("reading from relay: {e}")))?;
            if n == 0 {
                return Err(JobError::Notification(
                    "relay closed the connection".to_string(),
                ));
            }

            let line = line.trim_end();
            let code: u16 = line
                .get(..3)
                .and_then(|c| c.parse().ok())
                .ok_or_else(|| JobError::Notification(format!("malformed reply: {line}")))?;

            // "250-..." continues, "250 ..." ends the reply.
            if line.as_bytes().get(3) == Some(&b'-') {
                continue;
            }

            if accepted.contains(&code) {
                return Ok(());
            }
            return Err(JobError::Notification(format!("relay rejected: {line}")));
        }
    }
}
