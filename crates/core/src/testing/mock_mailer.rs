//! Mock mailer for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::mailer::{MailError, MailMessage, Mailer};

/// Mock implementation of the Mailer trait.
///
/// Records every delivered message for assertions and can be switched into
/// a failing mode to exercise delivery-error handling.
///
/// # Example
///
/// ```rust,ignore
/// use helpdesk_core::testing::MockMailer;
///
/// let mailer = MockMailer::new();
/// // ... create a ticket through the desk ...
/// assert_eq!(mailer.delivery_count().await, 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockMailer {
    deliveries: Arc<RwLock<Vec<MailMessage>>>,
    failing: Arc<RwLock<bool>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose deliveries always fail.
    pub fn failing() -> Self {
        Self {
            deliveries: Arc::new(RwLock::new(Vec::new())),
            failing: Arc::new(RwLock::new(true)),
        }
    }

    /// Get all successfully delivered messages.
    pub async fn deliveries(&self) -> Vec<MailMessage> {
        self.deliveries.read().await.clone()
    }

    /// Get the number of successful deliveries.
    pub async fn delivery_count(&self) -> usize {
        self.deliveries.read().await.len()
    }

    /// Clear recorded deliveries.
    pub async fn clear(&self) {
        self.deliveries.write().await.clear();
    }

    /// Make subsequent deliveries fail (or succeed again).
    pub async fn set_failing(&self, failing: bool) {
        *self.failing.write().await = failing;
    }
}

#[async_trait]
impl Mailer for MockMailer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn deliver(&self, message: MailMessage) -> Result<(), MailError> {
        if *self.failing.read().await {
            return Err(MailError::DeliveryFailed(format!(
                "mock failure sending to {}",
                message.to
            )));
        }
        self.deliveries.write().await.push(message);
        Ok(())
    }
}
