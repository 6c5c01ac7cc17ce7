//! Configuration for the Notify API service.

use std::time::Duration;

/// Notify API configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,
    /// Database URL
    pub database_url: String,
    /// SendGrid API key
    pub sendgrid_api_key: String,
    /// Sender address for all outbound email
    pub email_from: String,
    /// Request timeout
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let http_port = std::env::var("HTTP_PORT")
            .unwrap_or_else(|_| "8081".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("HTTP_PORT"))?;

        let sendgrid_api_key = std::env::var("SENDGRID_API_KEY")
            .map_err(|_| ConfigError::Missing("SENDGRID_API_KEY"))?;

        let email_from =
            std::env::var("EMAIL_FROM").map_err(|_| ConfigError::Missing("EMAIL_FROM"))?;

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("REQUEST_TIMEOUT_SECS"))?;

        Ok(Self {
            http_port,
            database_url,
            sendgrid_api_key,
            email_from,
            request_timeout: Duration::from_secs(request_timeout_secs),
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
