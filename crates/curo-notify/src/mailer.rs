//! Mailer abstraction
//!
//! Abstracts the sending backend so the orchestrator and the
//! notification service can be tested without a live email provider.

use async_trait::async_trait;

use crate::NotifyError;

/// An email message to be sent
#[derive(Debug, Clone)]
pub struct Email {
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html: String,
    /// Plain text body
    pub text: String,
}

impl Email {
    /// Create a new email
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        html: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html: html.into(),
            text: text.into(),
        }
    }

    /// Validate that the email can be sent
    pub fn validate(&self) -> Result<(), NotifyError> {
        if self.to.is_empty() {
            return Err(NotifyError::InvalidEmail("missing recipient"));
        }
        if self.subject.is_empty() {
            return Err(NotifyError::InvalidEmail("missing subject"));
        }
        if self.html.is_empty() && self.text.is_empty() {
            return Err(NotifyError::InvalidEmail("missing body"));
        }
        Ok(())
    }
}

/// Email sending abstraction
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one email
    async fn send(&self, email: &Email) -> Result<(), NotifyError>;
}
