//! SMTP mailer implementation over `lettre`.
//!
//! Uses the async STARTTLS relay transport. Credentials are optional so a
//! local mailcatcher works without auth.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Attachment, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use crate::config::SmtpConfig;
use crate::mail::{MailError, Mailer, OutgoingEmail, validate_message};

/// Sends email through a configured SMTP relay.
pub struct SmtpMailer {
    config: SmtpConfig,
    host: String,
    from: String,
}

impl SmtpMailer {
    /// Builds a mailer from configuration. Returns `None` when no SMTP host
    /// is configured, signalling that delivery is disabled.
    pub fn from_config(config: &SmtpConfig) -> Option<Self> {
        let host = config.host.clone()?;
        let from = config.from_address()?;
        Some(Self {
            config: config.clone(),
            host,
            from,
        })
    }

    fn build_message(&self, message: &OutgoingEmail) -> Result<Message, MailError> {
        let mut builder = Message::builder()
            .from(self.from.parse()?)
            .subject(message.subject.clone());

        for recipient in &message.to {
            builder = builder.to(recipient.parse()?);
        }

        let body_part = SinglePart::builder()
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone());

        if message.attachments.is_empty() {
            return builder
                .singlepart(body_part)
                .map_err(|e| MailError::Build(e.to_string()));
        }

        let mut multipart = MultiPart::mixed().singlepart(body_part);
        for attachment in &message.attachments {
            let content_type = attachment
                .content_type
                .parse::<ContentType>()
                .map_err(|e| MailError::Build(e.to_string()))?;
            multipart = multipart.singlepart(
                Attachment::new(attachment.filename.clone())
                    .body(attachment.content.clone(), content_type),
            );
        }

        builder
            .multipart(multipart)
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: OutgoingEmail) -> Result<(), MailError> {
        validate_message(&message)?;

        let email = self.build_message(&message)?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)?
                .port(self.config.port);

        if let (Some(user), Some(pass)) = (&self.config.username, &self.config.password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let transport = transport_builder.build();
        transport.send(email).await?;

        tracing::info!(
            to = ?message.to,
            subject = %message.subject,
            "Email sent via SMTP"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::EmailAttachment;

    fn smtp_config() -> SmtpConfig {
        SmtpConfig {
            host: Some("smtp.example.com".to_string()),
            port: 587,
            username: Some("mailer@example.com".to_string()),
            password: Some("secret".to_string()),
            from: None,
        }
    }

    #[test]
    fn from_config_requires_host() {
        assert!(SmtpMailer::from_config(&SmtpConfig::default()).is_none());
        assert!(SmtpMailer::from_config(&smtp_config()).is_some());
    }

    #[test]
    fn builds_multipart_message_with_pdf_attachment() {
        let mailer = SmtpMailer::from_config(&smtp_config()).unwrap();
        let message = OutgoingEmail {
            to: vec!["tech@example.com".to_string()],
            subject: "Report".to_string(),
            body: "Attached".to_string(),
            attachments: vec![EmailAttachment::pdf("report.pdf", b"%PDF-1.4".to_vec())],
        };

        let email = mailer.build_message(&message).unwrap();
        let formatted = String::from_utf8_lossy(&email.formatted()).to_string();
        assert!(formatted.contains("multipart/mixed"));
        assert!(formatted.contains("report.pdf"));
        assert!(formatted.contains("application/pdf"));
    }

    #[test]
    fn invalid_recipient_address_fails() {
        let mailer = SmtpMailer::from_config(&smtp_config()).unwrap();
        let message = OutgoingEmail {
            to: vec!["not-an-address".to_string()],
            subject: "Report".to_string(),
            body: "body".to_string(),
            attachments: Vec::new(),
        };

        assert!(matches!(
            mailer.build_message(&message),
            Err(MailError::Address(_))
        ));
    }
}
