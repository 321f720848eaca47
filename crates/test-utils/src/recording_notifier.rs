use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use jobctl::errors::{JobError, Result};
use jobctl::notify::{MailMessage, Notifier};

/// A fake notifier that records every message it is asked to send and
/// optionally fails delivery.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<MailMessage>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every delivery returns `JobError::Notification`. Messages are still
    /// recorded.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn send<'a>(
        &'a mut self,
        message: &'a MailMessage,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        let sent = Arc::clone(&self.sent);
        let fail = self.fail;

        Box::pin(async move {
            sent.lock().unwrap().push(message.clone());
            if fail {
                return Err(JobError::Notification("scripted delivery failure".to_string()));
            }
            Ok(())
        })
    }
}
