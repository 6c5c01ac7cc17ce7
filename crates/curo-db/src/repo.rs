//! Repository traits
//!
//! Define async repository interfaces for database operations. The
//! orchestrator depends on these traits, not on Postgres, so tests run
//! against in-memory implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use curo_types::Category;

use crate::error::DbResult;
use crate::models::*;

/// Profile repository trait
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Find a profile by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<ProfileRow>>;

    /// Find a profile by email
    async fn find_by_email(&self, email: &str) -> DbResult<Option<ProfileRow>>;

    /// Find a profile by Stripe customer ID
    async fn find_by_stripe_customer_id(&self, customer_id: &str) -> DbResult<Option<ProfileRow>>;

    /// Record the current subscription identity and status
    async fn set_subscription(
        &self,
        id: Uuid,
        subscription_id: &str,
        status: &str,
    ) -> DbResult<()>;

    /// Advance the paid-through boundary.
    ///
    /// Monotonic: the stored value never moves earlier, so a stale
    /// writer cannot roll back a later renewal.
    async fn advance_sub_end_date(&self, id: Uuid, end_date: DateTime<Utc>) -> DbResult<()>;

    /// Set the subscribed flag
    async fn set_subscribe_status(&self, id: Uuid, subscribed: bool) -> DbResult<()>;

    /// Flag or clear a failed renewal payment
    async fn set_payment_failed(&self, id: Uuid, failed: bool, at: DateTime<Utc>) -> DbResult<()>;
}

/// Per-category plan repository trait
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Upsert the plan held in one category (idempotent per category)
    async fn upsert(&self, profile_id: Uuid, category: Category, plan_name: &str) -> DbResult<()>;

    /// Get the plan held in one category, if any
    async fn get(&self, profile_id: Uuid, category: Category) -> DbResult<Option<PlanRow>>;

    /// List all plans held by a profile
    async fn list_for_profile(&self, profile_id: Uuid) -> DbResult<Vec<PlanRow>>;
}

/// Create order input
#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub plan_name: String,
    pub price_cents: i64,
    pub shipping_address: String,
    pub payment_status: String,
    pub form_submission_id: Option<Uuid>,
    pub is_renewal: bool,
}

/// Order repository trait
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Create a new order (delivery status starts as pending)
    async fn create(&self, order: CreateOrder) -> DbResult<OrderRow>;

    /// Most recent order for a profile, used to seed renewal orders
    async fn find_latest_for_profile(&self, profile_id: Uuid) -> DbResult<Option<OrderRow>>;

    /// Delivery status transition driven by shipping callbacks
    async fn update_delivery_status(&self, id: Uuid, status: &str) -> DbResult<()>;
}

/// Create billing history input
#[derive(Debug, Clone)]
pub struct CreateBillingEntry {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub external_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub description: String,
    pub billed_at: DateTime<Utc>,
    pub success: bool,
    pub recurring: bool,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
}

/// Billing history repository trait
///
/// The ledger is append-only: this trait deliberately exposes no
/// update or delete operation.
#[async_trait]
pub trait BillingHistoryRepository: Send + Sync {
    /// Insert a ledger entry, keyed on the external charge/invoice id.
    ///
    /// Returns `false` when an entry with the same external id already
    /// exists (webhook redelivery), in which case nothing is written.
    async fn insert(&self, entry: CreateBillingEntry) -> DbResult<bool>;

    /// Whether an entry exists for an external charge/invoice id
    async fn exists_by_external_id(&self, external_id: &str) -> DbResult<bool>;

    /// List entries for a profile, newest first
    async fn list_for_profile(&self, profile_id: Uuid, limit: i64) -> DbResult<Vec<BillingHistoryRow>>;
}

/// Form submission repository trait
#[async_trait]
pub trait FormSubmissionRepository: Send + Sync {
    /// Find a submission by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<FormSubmissionRow>>;

    /// Flip a pending submission to approved
    async fn approve(&self, id: Uuid) -> DbResult<()>;
}
