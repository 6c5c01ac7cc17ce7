//! Error types for the Checkout API service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use curo_billing_core::BillingError;
use serde::Serialize;

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Profile not found")]
    ProfileNotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Webhook error: {0}")]
    WebhookError(String),

    #[error("Payment failed")]
    PaymentFailed,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<BillingError> for ApiError {
    fn from(e: BillingError) -> Self {
        match e {
            BillingError::ProfileNotFound => Self::ProfileNotFound,
            // Precondition failures are the caller's problem: the
            // profile is missing a required linked identity or the
            // request is missing a required field.
            err if err.is_precondition() => Self::BadRequest(err.to_string()),
            BillingError::WebhookError(msg) => Self::WebhookError(msg),
            BillingError::PaymentFailed(msg) => {
                // Provider failure detail stays in the logs, not the
                // client response.
                tracing::warn!(detail = %msg, "Payment failed");
                Self::PaymentFailed
            }
            err => Self::Internal(err.to_string()),
        }
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ProfileNotFound => StatusCode::NOT_FOUND,
            Self::BadRequest(_) | Self::WebhookError(_) => StatusCode::BAD_REQUEST,
            Self::PaymentFailed => StatusCode::PAYMENT_REQUIRED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::ProfileNotFound => "PROFILE_NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::WebhookError(_) => "WEBHOOK_ERROR",
            Self::PaymentFailed => "PAYMENT_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        // Log internal errors
        if matches!(self, Self::Internal(_)) {
            tracing::error!(error = ?self, "Internal API error");
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
