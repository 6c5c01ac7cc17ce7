//! Stripe payment provider implementation

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::config::BillingConfig;
use crate::error::BillingError;
use crate::provider::{
    NewSubscription, OneTimeCharge, PaymentProvider, ProviderCharge, ProviderSubscription,
};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Stripe payment provider
#[derive(Clone)]
pub struct StripeProvider {
    client: Client,
    config: BillingConfig,
}

impl StripeProvider {
    /// Create a new Stripe provider
    pub fn new(config: BillingConfig) -> Self {
        let client = Client::new();
        Self { client, config }
    }

    /// Make authenticated request to Stripe
    async fn stripe_request<T: for<'de> Deserialize<'de>>(
        &self,
        method: reqwest::Method,
        endpoint: &str,
        form: Option<&[(&str, &str)]>,
        idempotency_key: Option<&str>,
    ) -> Result<T, BillingError> {
        let url = format!("{STRIPE_API_BASE}{endpoint}");

        let mut request = self
            .client
            .request(method, &url)
            .basic_auth(&self.config.stripe_secret_key, Option::<&str>::None);

        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }

        if let Some(form_data) = form {
            request = request.form(form_data);
        }

        let response = request.send().await.map_err(|e| {
            error!(error = %e, "Stripe API request failed");
            BillingError::ProviderError(e.to_string())
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Stripe API error");
            return Err(BillingError::ProviderError(format!(
                "Stripe API error: {status}"
            )));
        }

        response.json::<T>().await.map_err(|e| {
            error!(error = %e, "Failed to parse Stripe response");
            BillingError::Internal(e.to_string())
        })
    }

    /// Create a monthly recurring price with an inline product
    async fn create_monthly_price(
        &self,
        plan_name: &str,
        amount_cents: i64,
        currency: &str,
        idempotency_key: &str,
    ) -> Result<StripePrice, BillingError> {
        debug!(plan = %plan_name, amount = amount_cents, "Creating Stripe price");

        let amount = amount_cents.to_string();
        let form = [
            ("currency", currency),
            ("unit_amount", amount.as_str()),
            ("recurring[interval]", "month"),
            ("product_data[name]", plan_name),
        ];

        self.stripe_request(
            reqwest::Method::POST,
            "/prices",
            Some(&form),
            Some(idempotency_key),
        )
        .await
    }
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    #[instrument(skip(self, req), fields(customer = %req.customer_id, plan = %req.plan_name))]
    async fn create_subscription(
        &self,
        req: NewSubscription,
    ) -> Result<ProviderSubscription, BillingError> {
        debug!(amount = req.amount_cents, trial_end = ?req.trial_end, "Creating subscription");

        let price = self
            .create_monthly_price(
                &req.plan_name,
                req.amount_cents,
                &req.currency,
                &format!("{}-price", req.idempotency_key),
            )
            .await?;

        let user_id = req.metadata.user_id.to_string();
        let category = req.metadata.category.slug();
        let trial_end = req.trial_end.map(|t| t.timestamp().to_string());

        let mut form: Vec<(&str, &str)> = vec![
            ("customer", &req.customer_id),
            ("items[0][price]", &price.id),
            ("metadata[user_id]", &user_id),
            ("metadata[category]", category),
            ("metadata[plan]", &req.plan_name),
        ];
        if let Some(pm) = req.payment_method_id.as_deref() {
            form.push(("default_payment_method", pm));
        }
        if let Some(ref t) = trial_end {
            form.push(("trial_end", t));
        }
        if let Some(ref prev) = req.metadata.previous_plan {
            form.push(("metadata[previous_plan]", prev));
        }

        let sub: StripeSubscription = self
            .stripe_request(
                reqwest::Method::POST,
                "/subscriptions",
                Some(&form),
                Some(&req.idempotency_key),
            )
            .await?;

        Ok(sub.into())
    }

    #[instrument(skip(self, req), fields(customer = %req.customer_id, amount = req.amount_cents))]
    async fn charge_once(&self, req: OneTimeCharge) -> Result<ProviderCharge, BillingError> {
        debug!("Creating off-session payment intent");

        let amount = req.amount_cents.to_string();
        let user_id = req.user_id.to_string();
        let form = [
            ("amount", amount.as_str()),
            ("currency", req.currency.as_str()),
            ("customer", req.customer_id.as_str()),
            ("payment_method", req.payment_method_id.as_str()),
            ("off_session", "true"),
            ("confirm", "true"),
            ("metadata[user_id]", user_id.as_str()),
        ];

        let intent: StripePaymentIntent = self
            .stripe_request(
                reqwest::Method::POST,
                "/payment_intents",
                Some(&form),
                Some(&req.idempotency_key),
            )
            .await?;

        if intent.status != "succeeded" {
            return Err(BillingError::PaymentFailed(format!(
                "payment intent status: {}",
                intent.status
            )));
        }

        Ok(ProviderCharge {
            id: intent.id,
            status: intent.status,
        })
    }

    #[instrument(skip(self))]
    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
        cancel: bool,
    ) -> Result<(), BillingError> {
        debug!("Updating cancel_at_period_end");

        let cancel_str = if cancel { "true" } else { "false" };
        let form = [("cancel_at_period_end", cancel_str)];

        let _: StripeSubscription = self
            .stripe_request(
                reqwest::Method::POST,
                &format!("/subscriptions/{subscription_id}"),
                Some(&form),
                None,
            )
            .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, BillingError> {
        let sub: StripeSubscription = self
            .stripe_request(
                reqwest::Method::GET,
                &format!("/subscriptions/{subscription_id}"),
                None,
                None,
            )
            .await?;

        Ok(sub.into())
    }
}

// Stripe API response types

/// Stripe subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub customer: String,
    pub status: String,
    pub current_period_start: i64,
    pub current_period_end: i64,
    pub trial_end: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
}

impl From<StripeSubscription> for ProviderSubscription {
    fn from(sub: StripeSubscription) -> Self {
        ProviderSubscription {
            id: sub.id,
            status: sub.status,
            current_period_end: Utc
                .timestamp_opt(sub.current_period_end, 0)
                .single()
                .unwrap_or_else(Utc::now),
            trial_end: sub
                .trial_end
                .and_then(|t| Utc.timestamp_opt(t, 0).single()),
        }
    }
}

/// Stripe price
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripePrice {
    pub id: String,
    pub unit_amount: Option<i64>,
    pub currency: String,
}

/// Stripe payment intent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripePaymentIntent {
    pub id: String,
    pub status: String,
    pub amount: i64,
    pub currency: String,
}
