//! In-memory repositories and provider/mailer doubles for testing

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use curo_billing_core::{
    BillingError, NewSubscription, OneTimeCharge, PaymentProvider, ProviderCharge,
    ProviderSubscription,
};
use curo_db::{
    BillingHistoryRepository, BillingHistoryRow, CreateBillingEntry, CreateOrder,
    FormSubmissionRepository, FormSubmissionRow, OrderRepository, OrderRow, PlanRepository,
    PlanRow, ProfileRepository, ProfileRow, DbResult,
};
use curo_notify::{Email, Mailer, NotifyError};
use curo_types::Category;

/// In-memory profile repository
#[derive(Default, Clone)]
pub struct MockProfileRepository {
    profiles: Arc<DashMap<Uuid, ProfileRow>>,
}

impl MockProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_profile(&self, profile: ProfileRow) {
        self.profiles.insert(profile.id, profile);
    }

    pub fn get(&self, id: Uuid) -> Option<ProfileRow> {
        self.profiles.get(&id).map(|r| r.value().clone())
    }

    /// A profile with billing identity on file, ready for checkout
    pub fn test_profile() -> ProfileRow {
        ProfileRow {
            id: Uuid::new_v4(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: format!("ada-{}@example.com", Uuid::new_v4()),
            stripe_customer_id: Some("cus_test_1".to_string()),
            default_payment_method_id: Some("pm_test_1".to_string()),
            stripe_subscription_id: None,
            subscription_status: "none".to_string(),
            current_sub_end_date: None,
            subscribe_status: false,
            payment_failed: false,
            payment_failed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

#[async_trait]
impl ProfileRepository for MockProfileRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<ProfileRow>> {
        Ok(self.profiles.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_email(&self, email: &str) -> DbResult<Option<ProfileRow>> {
        Ok(self
            .profiles
            .iter()
            .find(|r| r.value().email == email)
            .map(|r| r.value().clone()))
    }

    async fn find_by_stripe_customer_id(&self, customer_id: &str) -> DbResult<Option<ProfileRow>> {
        Ok(self
            .profiles
            .iter()
            .find(|r| r.value().stripe_customer_id.as_deref() == Some(customer_id))
            .map(|r| r.value().clone()))
    }

    async fn set_subscription(&self, id: Uuid, subscription_id: &str, status: &str) -> DbResult<()> {
        if let Some(mut profile) = self.profiles.get_mut(&id) {
            profile.stripe_subscription_id = Some(subscription_id.to_string());
            profile.subscription_status = status.to_string();
            profile.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn advance_sub_end_date(&self, id: Uuid, end_date: DateTime<Utc>) -> DbResult<()> {
        if let Some(mut profile) = self.profiles.get_mut(&id) {
            // Mirrors the GREATEST() guard in the Postgres implementation
            let current = profile.current_sub_end_date;
            profile.current_sub_end_date = Some(match current {
                Some(existing) if existing > end_date => existing,
                _ => end_date,
            });
            profile.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_subscribe_status(&self, id: Uuid, subscribed: bool) -> DbResult<()> {
        if let Some(mut profile) = self.profiles.get_mut(&id) {
            profile.subscribe_status = subscribed;
        }
        Ok(())
    }

    async fn set_payment_failed(&self, id: Uuid, failed: bool, at: DateTime<Utc>) -> DbResult<()> {
        if let Some(mut profile) = self.profiles.get_mut(&id) {
            profile.payment_failed = failed;
            profile.payment_failed_at = failed.then_some(at);
        }
        Ok(())
    }
}

/// In-memory per-category plan repository
#[derive(Default, Clone)]
pub struct MockPlanRepository {
    plans: Arc<DashMap<(Uuid, &'static str), PlanRow>>,
}

impl MockPlanRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlanRepository for MockPlanRepository {
    async fn upsert(&self, profile_id: Uuid, category: Category, plan_name: &str) -> DbResult<()> {
        self.plans.insert(
            (profile_id, category.slug()),
            PlanRow {
                profile_id,
                category: category.slug().to_string(),
                plan_name: plan_name.to_string(),
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get(&self, profile_id: Uuid, category: Category) -> DbResult<Option<PlanRow>> {
        Ok(self
            .plans
            .get(&(profile_id, category.slug()))
            .map(|r| r.value().clone()))
    }

    async fn list_for_profile(&self, profile_id: Uuid) -> DbResult<Vec<PlanRow>> {
        Ok(self
            .plans
            .iter()
            .filter(|r| r.key().0 == profile_id)
            .map(|r| r.value().clone())
            .collect())
    }
}

/// In-memory order repository
#[derive(Default, Clone)]
pub struct MockOrderRepository {
    orders: Arc<Mutex<Vec<OrderRow>>>,
}

impl MockOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<OrderRow> {
        self.orders.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderRepository for MockOrderRepository {
    async fn create(&self, order: CreateOrder) -> DbResult<OrderRow> {
        let row = OrderRow {
            id: order.id,
            profile_id: order.profile_id,
            plan_name: order.plan_name,
            price_cents: order.price_cents,
            shipping_address: order.shipping_address,
            payment_status: order.payment_status,
            delivery_status: "pending".to_string(),
            form_submission_id: order.form_submission_id,
            is_renewal: order.is_renewal,
            created_at: Utc::now(),
        };
        self.orders.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn find_latest_for_profile(&self, profile_id: Uuid) -> DbResult<Option<OrderRow>> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|o| o.profile_id == profile_id)
            .cloned())
    }

    async fn update_delivery_status(&self, id: Uuid, status: &str) -> DbResult<()> {
        if let Some(order) = self.orders.lock().unwrap().iter_mut().find(|o| o.id == id) {
            order.delivery_status = status.to_string();
        }
        Ok(())
    }
}

/// In-memory billing history repository (dedupes on external id, like
/// the `ON CONFLICT DO NOTHING` insert in Postgres)
#[derive(Default, Clone)]
pub struct MockBillingHistoryRepository {
    entries: Arc<Mutex<Vec<BillingHistoryRow>>>,
}

impl MockBillingHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<BillingHistoryRow> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl BillingHistoryRepository for MockBillingHistoryRepository {
    async fn insert(&self, entry: CreateBillingEntry) -> DbResult<bool> {
        let mut entries = self.entries.lock().unwrap();
        if entries.iter().any(|e| e.external_id == entry.external_id) {
            return Ok(false);
        }
        entries.push(BillingHistoryRow {
            id: entry.id,
            profile_id: entry.profile_id,
            external_id: entry.external_id,
            amount_cents: entry.amount_cents,
            currency: entry.currency,
            description: entry.description,
            billed_at: entry.billed_at,
            success: entry.success,
            recurring: entry.recurring,
            period_start: entry.period_start,
            period_end: entry.period_end,
        });
        Ok(true)
    }

    async fn exists_by_external_id(&self, external_id: &str) -> DbResult<bool> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .any(|e| e.external_id == external_id))
    }

    async fn list_for_profile(&self, profile_id: Uuid, limit: i64) -> DbResult<Vec<BillingHistoryRow>> {
        // Newest first, like the ORDER BY billed_at DESC in Postgres
        let mut rows: Vec<BillingHistoryRow> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.profile_id == profile_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.billed_at.cmp(&a.billed_at));
        rows.truncate(limit as usize);
        Ok(rows)
    }
}

/// In-memory form submission repository
#[derive(Default, Clone)]
pub struct MockFormSubmissionRepository {
    forms: Arc<DashMap<Uuid, FormSubmissionRow>>,
}

impl MockFormSubmissionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_pending(&self, id: Uuid, profile_id: Uuid) {
        self.forms.insert(
            id,
            FormSubmissionRow {
                id,
                profile_id,
                approval_status: "pending".to_string(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        );
    }

    pub fn status(&self, id: Uuid) -> Option<String> {
        self.forms.get(&id).map(|r| r.value().approval_status.clone())
    }
}

#[async_trait]
impl FormSubmissionRepository for MockFormSubmissionRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<FormSubmissionRow>> {
        Ok(self.forms.get(&id).map(|r| r.value().clone()))
    }

    async fn approve(&self, id: Uuid) -> DbResult<()> {
        if let Some(mut form) = self.forms.get_mut(&id) {
            if form.approval_status == "pending" {
                form.approval_status = "approved".to_string();
                form.updated_at = Utc::now();
            }
        }
        Ok(())
    }
}

/// What the mock provider was asked to do, in order
#[derive(Debug, Clone)]
pub enum ProviderCall {
    ChargeOnce {
        amount_cents: i64,
    },
    CreateSubscription {
        amount_cents: i64,
        trial_end: Option<DateTime<Utc>>,
        previous_plan: Option<String>,
    },
    SetCancelAtPeriodEnd {
        subscription_id: String,
        cancel: bool,
    },
}

/// Recording payment provider double
#[derive(Clone)]
pub struct MockProvider {
    pub calls: Arc<Mutex<Vec<ProviderCall>>>,
    /// Status returned from create_subscription ("trialing" by default)
    pub subscription_status: Arc<Mutex<String>>,
    counter: Arc<Mutex<u32>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            subscription_status: Arc::new(Mutex::new("trialing".to_string())),
            counter: Arc::new(Mutex::new(0)),
        }
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, status: &str) {
        *self.subscription_status.lock().unwrap() = status.to_string();
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProvider for MockProvider {
    async fn create_subscription(
        &self,
        req: NewSubscription,
    ) -> Result<ProviderSubscription, BillingError> {
        self.calls.lock().unwrap().push(ProviderCall::CreateSubscription {
            amount_cents: req.amount_cents,
            trial_end: req.trial_end,
            previous_plan: req.metadata.previous_plan.clone(),
        });
        let n = {
            let mut counter = self.counter.lock().unwrap();
            *counter += 1;
            *counter
        };
        let period_end = req.trial_end.unwrap_or_else(|| Utc::now() + Duration::days(30));
        Ok(ProviderSubscription {
            id: format!("sub_test_{n}"),
            status: self.subscription_status.lock().unwrap().clone(),
            current_period_end: period_end,
            trial_end: req.trial_end,
        })
    }

    async fn charge_once(&self, req: OneTimeCharge) -> Result<ProviderCharge, BillingError> {
        self.calls.lock().unwrap().push(ProviderCall::ChargeOnce {
            amount_cents: req.amount_cents,
        });
        Ok(ProviderCharge {
            id: "pi_test_1".to_string(),
            status: "succeeded".to_string(),
        })
    }

    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
        cancel: bool,
    ) -> Result<(), BillingError> {
        self.calls.lock().unwrap().push(ProviderCall::SetCancelAtPeriodEnd {
            subscription_id: subscription_id.to_string(),
            cancel,
        });
        Ok(())
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, BillingError> {
        Ok(ProviderSubscription {
            id: subscription_id.to_string(),
            status: self.subscription_status.lock().unwrap().clone(),
            current_period_end: Utc::now() + Duration::days(30),
            trial_end: None,
        })
    }
}

/// Recording mailer double
#[derive(Default, Clone)]
pub struct MockMailer {
    pub sent: Arc<Mutex<Vec<Email>>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, email: &Email) -> Result<(), NotifyError> {
        email.validate()?;
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}
