//! Payment provider abstraction

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use curo_types::{Category, UserId};

use crate::BillingError;

/// Metadata attached to provider-side subscriptions so webhook events
/// can be attributed back to a user and plan
#[derive(Debug, Clone)]
pub struct SubscriptionMetadata {
    pub user_id: UserId,
    pub category: Category,
    pub plan_name: String,
    /// Back-reference to the plan being replaced (dosage change)
    pub previous_plan: Option<String>,
}

/// Request to create a monthly recurring subscription
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub customer_id: String,
    pub payment_method_id: Option<String>,
    pub plan_name: String,
    pub amount_cents: i64,
    pub currency: String,
    /// When set, the first charge happens at this boundary instead of
    /// at creation
    pub trial_end: Option<DateTime<Utc>>,
    pub metadata: SubscriptionMetadata,
    /// Deterministic key so client retries cannot double-create
    pub idempotency_key: String,
}

/// Request for a one-time off-session charge
#[derive(Debug, Clone)]
pub struct OneTimeCharge {
    pub customer_id: String,
    pub payment_method_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub user_id: UserId,
    pub idempotency_key: String,
}

/// A provider-side subscription as the orchestrator sees it
#[derive(Debug, Clone)]
pub struct ProviderSubscription {
    pub id: String,
    /// Raw provider status string ("trialing", "active", "incomplete", ...)
    pub status: String,
    pub current_period_end: DateTime<Utc>,
    pub trial_end: Option<DateTime<Utc>>,
}

impl ProviderSubscription {
    /// The next date the provider will attempt a charge
    pub fn next_billing_date(&self) -> DateTime<Utc> {
        self.trial_end.unwrap_or(self.current_period_end)
    }
}

/// A completed (or attempted) one-time charge
#[derive(Debug, Clone)]
pub struct ProviderCharge {
    pub id: String,
    pub status: String,
}

/// Payment provider trait
///
/// Abstracts payment processing to allow different providers and
/// in-memory test doubles.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a monthly subscription
    async fn create_subscription(
        &self,
        req: NewSubscription,
    ) -> Result<ProviderSubscription, BillingError>;

    /// Charge the stored payment method once, off-session
    async fn charge_once(&self, req: OneTimeCharge) -> Result<ProviderCharge, BillingError>;

    /// Schedule or unschedule cancellation at the current period end
    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
        cancel: bool,
    ) -> Result<(), BillingError>;

    /// Fetch a subscription
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, BillingError>;
}
