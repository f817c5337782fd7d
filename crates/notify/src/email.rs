//! SMTP emailer via `lettre` with TLS support.
//!
//! Delivers report emails, optionally with the report file attached.
//! Supports STARTTLS and implicit TLS connections.

use crate::traits::{EmailContent, Emailer, NotifyError};
use lettre::{
    message::{header::ContentType, Attachment as MailAttachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

/// Sends emails via SMTP.
#[derive(Debug)]
pub struct SmtpEmailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailer {
    /// Build an `SmtpEmailer` from SMTP configuration.
    ///
    /// - `smtp_port`: Optional port (defaults to 587). Port 465 uses implicit TLS.
    /// - `tls`: `None` or `Some(true)` enables STARTTLS on ports other than 465.
    /// - `from`: Sender address (`"reports@example.com"` or `"Reports <reports@example.com>"`).
    ///
    /// - `credentials`: `(username, password)`; `None` connects unauthenticated.
    pub fn from_config(
        smtp_host: &str,
        smtp_port: Option<u16>,
        tls: Option<bool>,
        from: &str,
        credentials: Option<(String, String)>,
    ) -> Result<Self, NotifyError> {
        let from_mailbox: Mailbox = from
            .parse()
            .map_err(|e: lettre::address::AddressError| NotifyError::Config(e.to_string()))?;

        let port = smtp_port.unwrap_or(587);
        let use_tls = tls.unwrap_or(true);

        let mut builder = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)
                .map_err(|e| NotifyError::Config(e.to_string()))?
                .port(port)
        } else if use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp_host)
                .map_err(|e| NotifyError::Config(e.to_string()))?
                .port(port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(smtp_host).port(port)
        };

        if let Some((username, password)) = credentials {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(Self {
            transport: builder.build(),
            from: from_mailbox,
        })
    }

    /// Assemble the MIME message: plain body, plus the attachment as a
    /// second part when present.
    pub fn build_message(
        &self,
        recipients: &[String],
        email: &EmailContent,
    ) -> Result<Message, NotifyError> {
        if recipients.is_empty() {
            return Err(NotifyError::Config(
                "at least one recipient is required".to_string(),
            ));
        }

        let mut message_builder = Message::builder()
            .from(self.from.clone())
            .subject(&email.subject);
        for addr in recipients {
            let mailbox: Mailbox = addr
                .parse()
                .map_err(|e: lettre::address::AddressError| NotifyError::Config(e.to_string()))?;
            message_builder = message_builder.to(mailbox);
        }

        let message = match &email.attachment {
            None => message_builder.body(email.body.clone()),
            Some(att) => {
                let content_type = ContentType::parse(&att.content_type)
                    .map_err(|e| NotifyError::Config(e.to_string()))?;
                let file = MailAttachment::new(att.filename.clone())
                    .body(att.data.clone(), content_type);
                message_builder.multipart(
                    MultiPart::mixed()
                        .singlepart(SinglePart::plain(email.body.clone()))
                        .singlepart(file),
                )
            }
        };
        message.map_err(|e| NotifyError::Smtp(e.to_string()))
    }
}

#[async_trait::async_trait]
impl Emailer for SmtpEmailer {
    async fn send(&self, recipients: &[String], email: &EmailContent) -> Result<(), NotifyError> {
        let message = self.build_message(recipients, email)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        tracing::info!(
            subject = %email.subject,
            recipients = recipients.len(),
            attachment = email.attachment.as_ref().map(|a| a.filename.as_str()).unwrap_or(""),
            "email delivered"
        );

        Ok(())
    }
}
