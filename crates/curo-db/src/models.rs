//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive.
//! Status columns are stored as text and parsed into the typed enums
//! from `curo-types` at the edges.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Profile row from the database
///
/// One per user. Billing identity and subscription state live here;
/// the per-category plan map lives in `profile_plans`.
#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub stripe_customer_id: Option<String>,
    pub default_payment_method_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub subscription_status: String,
    pub current_sub_end_date: Option<DateTime<Utc>>,
    pub subscribe_status: bool,
    pub payment_failed: bool,
    pub payment_failed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileRow {
    /// Convert to domain UserId
    pub fn user_id(&self) -> curo_types::UserId {
        curo_types::UserId(self.id)
    }

    /// Full name for email salutations
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Per-category plan row from the `profile_plans` side table
///
/// Unique on (profile_id, category): a user holds at most one plan per
/// treatment category.
#[derive(Debug, Clone, FromRow)]
pub struct PlanRow {
    pub profile_id: Uuid,
    pub category: String,
    pub plan_name: String,
    pub updated_at: DateTime<Utc>,
}

/// Order row from the database
#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub plan_name: String,
    pub price_cents: i64,
    pub shipping_address: String,
    pub payment_status: String,
    pub delivery_status: String,
    pub form_submission_id: Option<Uuid>,
    pub is_renewal: bool,
    pub created_at: DateTime<Utc>,
}

/// Billing history row: one ledger entry per financial event
///
/// Append-only: never updated or deleted after insert.
#[derive(Debug, Clone, FromRow)]
pub struct BillingHistoryRow {
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

/// Form submission row (eligibility questionnaire)
#[derive(Debug, Clone, FromRow)]
pub struct FormSubmissionRow {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub approval_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
