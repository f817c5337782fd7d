//! Outbound delivery for generated reports.
//!
//! This crate provides:
//! - `Emailer` trait for pluggable email delivery
//! - SMTP implementation backed by `lettre`, with file attachments
//! - Minijinja rendering for report subjects, bodies and template scripts

pub mod email;
pub mod templating;
pub mod traits;

pub use email::SmtpEmailer;
pub use templating::TemplateRenderer;
pub use traits::{Attachment, EmailContent, Emailer, NotifyError};
