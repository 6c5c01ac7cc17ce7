//! Billing errors

use thiserror::Error;

/// Billing errors
#[derive(Error, Debug)]
pub enum BillingError {
    /// Profile not found
    #[error("profile not found")]
    ProfileNotFound,

    /// Profile has no payment-provider customer on file
    #[error("no billing account on file")]
    MissingCustomerId,

    /// Profile has no default payment method on file
    #[error("no payment method on file")]
    MissingPaymentMethod,

    /// Profile has no subscription to modify
    #[error("no subscription on file")]
    MissingSubscriptionId,

    /// Request is missing a required field
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Payment declined or subscription came back incomplete
    #[error("payment failed: {0}")]
    PaymentFailed(String),

    /// Payment provider error
    #[error("provider error: {0}")]
    ProviderError(String),

    /// Webhook verification or processing error
    #[error("webhook error: {0}")]
    WebhookError(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] curo_db::DbError),

    /// Email send error
    #[error("notification error: {0}")]
    Notify(#[from] curo_notify::NotifyError),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl BillingError {
    /// Precondition errors: the request referenced a profile that is
    /// missing a required linked identity
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::ProfileNotFound
                | Self::MissingCustomerId
                | Self::MissingPaymentMethod
                | Self::MissingSubscriptionId
                | Self::MissingField(_)
        )
    }

    /// Whether this is a provider-side failure
    pub fn is_provider_error(&self) -> bool {
        matches!(self, Self::ProviderError(_) | Self::PaymentFailed(_))
    }
}
