// src/mail/mod.rs
//! Outbound email: the ability to deliver one message.

mod sparkpost;

use crate::error::AppError;
use crate::types::EmailAddress;

pub use sparkpost::SparkPostNotifier;

/// Who a message appears to come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub address: EmailAddress,
    pub display_name: String,
}

/// One HTML email to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub from: Sender,
}

/// The ability to send an email.
///
/// # Laws
///
/// - `Ok(())` means the provider accepted the message for every recipient.
/// - A single attempt is made; failures are not retried.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), AppError>;
}
