//! Email delivery module
//!
//! Provides the [`Mailer`] capability the intervention notification flow
//! depends on. The core only ever sees the trait; the server wires in the
//! SMTP transport when configured and the recording mock otherwise (and in
//! tests). Delivery is best-effort: there is no retry and no queue.

pub mod smtp;

use async_trait::async_trait;
use std::sync::Mutex;

pub use smtp::SmtpMailer;

/// One attachment carried by an outgoing email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

impl EmailAttachment {
    pub fn pdf(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: "application/pdf".to_string(),
            content,
        }
    }
}

/// An outgoing email message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<EmailAttachment>,
}

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// A recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// The message is structurally invalid (no recipients, empty subject).
    #[error("Invalid email message: {0}")]
    InvalidMessage(String),
}

/// Capability for sending email. Implementations must be cheap to share.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one message. Returns once the transport accepted or rejected it.
    async fn send(&self, message: OutgoingEmail) -> Result<(), MailError>;
}

pub(crate) fn validate_message(message: &OutgoingEmail) -> Result<(), MailError> {
    if message.to.is_empty() {
        return Err(MailError::InvalidMessage(
            "at least one recipient is required".to_string(),
        ));
    }
    if message.subject.is_empty() {
        return Err(MailError::InvalidMessage(
            "subject cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Mailer that records messages instead of delivering them. Used in tests
/// and when no SMTP host is configured.
#[derive(Debug, Default)]
pub struct MockMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages recorded so far.
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, message: OutgoingEmail) -> Result<(), MailError> {
        validate_message(&message)?;
        tracing::info!(
            to = ?message.to,
            subject = %message.subject,
            attachments = message.attachments.len(),
            "Mock mailer recorded message"
        );
        self.sent.lock().expect("mailer mutex poisoned").push(message);
        Ok(())
    }
}
