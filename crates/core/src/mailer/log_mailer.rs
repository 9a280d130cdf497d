use async_trait::async_trait;

use super::{MailError, MailMessage, Mailer};

/// Mailer that writes each message to the log instead of sending it.
#[derive(Debug, Default)]
pub struct LogMailer;

impl LogMailer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Mailer for LogMailer {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, message: MailMessage) -> Result<(), MailError> {
        if !message.to.contains('@') {
            return Err(MailError::InvalidRecipient(message.to));
        }
        tracing::info!(
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            topic_id = ?message.topic_id,
            "Notification delivered"
        );
        Ok(())
    }
}
