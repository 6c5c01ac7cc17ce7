//! Configuration for the Checkout API service.

use curo_billing_core::BillingConfig;
use std::time::Duration;

/// Checkout API configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,
    /// Database URL
    pub database_url: String,
    /// Billing core configuration
    pub billing: BillingConfig,
    /// SendGrid API key
    pub sendgrid_api_key: String,
    /// Sender address for all outbound email
    pub email_from: String,
    /// Request timeout
    pub request_timeout: Duration,
    /// Metrics enabled
    pub metrics_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Database
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        // Server port
        let http_port = std::env::var("HTTP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("HTTP_PORT"))?;

        // Stripe configuration
        let stripe_secret_key = std::env::var("STRIPE_SECRET_KEY")
            .map_err(|_| ConfigError::Missing("STRIPE_SECRET_KEY"))?;

        let stripe_webhook_secret = std::env::var("STRIPE_WEBHOOK_SECRET")
            .map_err(|_| ConfigError::Missing("STRIPE_WEBHOOK_SECRET"))?;

        // Email configuration
        let sendgrid_api_key = std::env::var("SENDGRID_API_KEY")
            .map_err(|_| ConfigError::Missing("SENDGRID_API_KEY"))?;

        let email_from =
            std::env::var("EMAIL_FROM").map_err(|_| ConfigError::Missing("EMAIL_FROM"))?;

        // Flat fee amounts (cents)
        let dosage_fee_cents: i64 = std::env::var("DOSAGE_FEE_CENTS")
            .unwrap_or_else(|_| "2500".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("DOSAGE_FEE_CENTS"))?;

        let eligibility_fee_cents: i64 = std::env::var("ELIGIBILITY_FEE_CENTS")
            .unwrap_or_else(|_| "4900".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("ELIGIBILITY_FEE_CENTS"))?;

        // Failed-renewal signal deduplication
        let dedupe_invoice_events = std::env::var("DEDUPE_INVOICE_EVENTS")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        // Request timeout
        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("REQUEST_TIMEOUT_SECS"))?;

        // Metrics
        let metrics_enabled = std::env::var("METRICS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        // Build billing config
        let billing = BillingConfig::new(&stripe_secret_key, &stripe_webhook_secret)
            .with_fees(dosage_fee_cents, eligibility_fee_cents)
            .with_dedupe(dedupe_invoice_events);

        Ok(Self {
            http_port,
            database_url,
            billing,
            sendgrid_api_key,
            email_from,
            request_timeout: Duration::from_secs(request_timeout_secs),
            metrics_enabled,
        })
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
