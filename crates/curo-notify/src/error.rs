//! Notification errors

use thiserror::Error;

/// Notification errors
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Email is missing a required field
    #[error("invalid email: {0}")]
    InvalidEmail(&'static str),

    /// Email provider rejected or failed the send
    #[error("provider error: {0}")]
    ProviderError(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}
