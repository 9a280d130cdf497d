//! Outgoing requester notifications.
//!
//! Delivery is a collaborator behind the [`Mailer`] trait. The bundled
//! [`LogMailer`] only records messages in the log.

mod log_mailer;
mod traits;
mod types;

pub use log_mailer::LogMailer;
pub use traits::{MailError, Mailer};
pub use types::MailMessage;
