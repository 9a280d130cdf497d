use async_trait::async_trait;
use thiserror::Error;

use super::MailMessage;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Something that can deliver a message to a requester.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Returns the name of this mailer implementation.
    fn name(&self) -> &str;

    /// Deliver one message. Failures are reported, never retried.
    async fn deliver(&self, message: MailMessage) -> Result<(), MailError>;
}
