//! SendGrid mailer implementation

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, instrument};

use crate::mailer::{Email, Mailer};
use crate::NotifyError;

const SENDGRID_API_BASE: &str = "https://api.sendgrid.com/v3";

/// SendGrid email provider
#[derive(Clone)]
pub struct SendGridMailer {
    client: Client,
    api_key: String,
    from: String,
}

impl SendGridMailer {
    /// Create a new SendGrid mailer
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            from: from.into(),
        }
    }

    /// Sender address used on outgoing mail
    pub fn from_address(&self) -> &str {
        &self.from
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    #[instrument(skip(self, email), fields(to = %email.to, subject = %email.subject))]
    async fn send(&self, email: &Email) -> Result<(), NotifyError> {
        email.validate()?;

        debug!("Sending email via SendGrid");

        let body = serde_json::json!({
            "personalizations": [{ "to": [{ "email": email.to }] }],
            "from": { "email": self.from },
            "subject": email.subject,
            "content": [
                { "type": "text/plain", "value": email.text },
                { "type": "text/html", "value": email.html },
            ],
        });

        let response = self
            .client
            .post(format!("{SENDGRID_API_BASE}/mail/send"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "SendGrid request failed");
                NotifyError::ProviderError(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "SendGrid API error");
            return Err(NotifyError::ProviderError(format!(
                "SendGrid API error: {status}"
            )));
        }

        Ok(())
    }
}
