//! Emailer trait definition and shared error types.

/// Errors that can occur during email delivery or template rendering.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("SMTP delivery failed: {0}")]
    Smtp(String),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// A file attached to an outgoing email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    /// MIME type, e.g. `text/csv`.
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Rendered email ready for delivery.
#[derive(Debug, Clone)]
pub struct EmailContent {
    pub subject: String,
    pub body: String,
    pub attachment: Option<Attachment>,
}

/// Delivers emails to a list of recipients.
#[async_trait::async_trait]
pub trait Emailer: Send + Sync {
    async fn send(&self, recipients: &[String], email: &EmailContent) -> Result<(), NotifyError>;
}

#[async_trait::async_trait]
impl<T: Emailer + ?Sized> Emailer for std::sync::Arc<T> {
    async fn send(&self, recipients: &[String], email: &EmailContent) -> Result<(), NotifyError> {
        (**self).send(recipients, email).await
    }
}
