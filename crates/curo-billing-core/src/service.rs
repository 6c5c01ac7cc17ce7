//! Checkout service - the subscription orchestrator
//!
//! Given a classified synchronous request (new purchase, dosage change,
//! reactivation) or a verified provider webhook event, decides what
//! mutation to apply to the subscription and the profile/order/ledger
//! records, and what notification to send.
//!
//! Execution is sequential per invocation with no compensation: the
//! first failing downstream call aborts the handler. Drift between the
//! provider and the store is reconciled by the webhook path re-deriving
//! state from provider events.

use std::sync::Arc;

use chrono::{DateTime, Duration, Months, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use curo_db::{
    BillingHistoryRepository, CreateBillingEntry, CreateOrder, FormSubmissionRepository,
    OrderRepository, PlanRepository, ProfileRepository, ProfileRow,
};
use curo_notify::{templates, Mailer};
use curo_types::{Category, PaymentStatus, UserId};

use crate::config::BillingConfig;
use crate::error::BillingError;
use crate::provider::{NewSubscription, OneTimeCharge, PaymentProvider, SubscriptionMetadata};
use crate::webhook::{ChargeData, InvoiceData, WebhookEventData, WebhookEventType, WebhookHandler};

/// How the caller wants the subscription changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    /// First purchase of a plan in a category
    NewPurchase,
    /// Swap the current plan for a different dose within a category
    DosageChange,
    /// Resume a fully-canceled subscription
    Reactivation,
}

impl From<&str> for RequestType {
    fn from(s: &str) -> Self {
        match s {
            "activate subscription" => Self::Reactivation,
            "dosage change" => Self::DosageChange,
            _ => Self::NewPurchase,
        }
    }
}

/// A classified synchronous checkout request
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub user_id: UserId,
    pub product_name: String,
    /// Price charged this period, in cents
    pub product_price: i64,
    /// Caller-supplied category hint (free text)
    pub product_category: String,
    /// Full non-promotional monthly price, in cents
    pub real_price: Option<i64>,
    pub shipping_address: String,
    pub form_submission_id: Option<Uuid>,
    pub request_type: RequestType,
}

/// Result of a successful checkout operation
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub subscription_id: String,
    pub next_billing_date: DateTime<Utc>,
    pub message: &'static str,
}

/// Trial boundary for reactivation and dosage change: the later of the
/// previously paid-through date and `now + 1 day`.
///
/// The one-day floor keeps the trial end strictly in the future, since
/// a boundary at or before the request instant would bill immediately.
pub fn trial_boundary(prior_end: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = now + Duration::days(1);
    match prior_end {
        Some(end) if end > floor => end,
        _ => floor,
    }
}

/// Trial end for a discounted first period: exactly one calendar month
/// from now, so the discounted one-time charge and the first recurring
/// charge never land in the same month.
///
/// Deliberately a different policy from [`trial_boundary`]; the two
/// must not be unified.
pub fn first_month_trial_end(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_add_months(Months::new(1))
        .unwrap_or(now + Duration::days(31))
}

/// Subscription orchestrator
pub struct CheckoutService {
    profiles: Arc<dyn ProfileRepository>,
    plans: Arc<dyn PlanRepository>,
    orders: Arc<dyn OrderRepository>,
    billing_history: Arc<dyn BillingHistoryRepository>,
    form_submissions: Arc<dyn FormSubmissionRepository>,
    provider: Arc<dyn PaymentProvider>,
    mailer: Arc<dyn Mailer>,
    webhook: WebhookHandler,
    config: BillingConfig,
}

impl CheckoutService {
    /// Create a new checkout service
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        plans: Arc<dyn PlanRepository>,
        orders: Arc<dyn OrderRepository>,
        billing_history: Arc<dyn BillingHistoryRepository>,
        form_submissions: Arc<dyn FormSubmissionRepository>,
        provider: Arc<dyn PaymentProvider>,
        mailer: Arc<dyn Mailer>,
        config: BillingConfig,
    ) -> Self {
        let webhook = WebhookHandler::new(config.stripe_webhook_secret.clone());
        Self {
            profiles,
            plans,
            orders,
            billing_history,
            form_submissions,
            provider,
            mailer,
            webhook,
            config,
        }
    }

    // =========================================================================
    // Synchronous request path
    // =========================================================================

    /// Process a synchronous checkout request
    #[instrument(skip(self, req), fields(user_id = %req.user_id, request_type = ?req.request_type))]
    pub async fn process_request(
        &self,
        req: CheckoutRequest,
    ) -> Result<CheckoutOutcome, BillingError> {
        let profile = self
            .profiles
            .find_by_id(req.user_id.0)
            .await?
            .ok_or(BillingError::ProfileNotFound)?;

        match req.request_type {
            RequestType::Reactivation => self.reactivate(&req, &profile).await,
            RequestType::DosageChange => self.dosage_change(&req, &profile).await,
            RequestType::NewPurchase => self.new_purchase(&req, &profile).await,
        }
    }

    /// Resume a canceled subscription without charging until the
    /// originally paid-through date.
    async fn reactivate(
        &self,
        req: &CheckoutRequest,
        profile: &ProfileRow,
    ) -> Result<CheckoutOutcome, BillingError> {
        let customer_id = profile
            .stripe_customer_id
            .clone()
            .ok_or(BillingError::MissingCustomerId)?;

        let now = Utc::now();
        let category = Category::classify(&req.product_name, &req.product_category);
        let boundary = trial_boundary(profile.current_sub_end_date, now);

        let sub = self
            .provider
            .create_subscription(NewSubscription {
                customer_id,
                payment_method_id: profile.default_payment_method_id.clone(),
                plan_name: req.product_name.clone(),
                amount_cents: req.product_price,
                currency: self.config.currency.clone(),
                trial_end: Some(boundary),
                metadata: SubscriptionMetadata {
                    user_id: req.user_id,
                    category,
                    plan_name: req.product_name.clone(),
                    previous_plan: None,
                },
                idempotency_key: reactivation_key(req, boundary),
            })
            .await?;

        let next_billing = sub.next_billing_date();

        self.plans.upsert(profile.id, category, &req.product_name).await?;
        self.profiles.set_subscription(profile.id, &sub.id, &sub.status).await?;
        self.profiles.set_subscribe_status(profile.id, true).await?;
        self.profiles.advance_sub_end_date(profile.id, next_billing).await?;

        if let Some(form_id) = req.form_submission_id {
            self.form_submissions.approve(form_id).await?;
        }

        self.mailer
            .send(&templates::welcome_back(
                &profile.email,
                &profile.first_name,
                &req.product_name,
                next_billing,
            ))
            .await?;

        info!(subscription_id = %sub.id, next_billing = %next_billing, "Subscription reactivated");

        Ok(CheckoutOutcome {
            subscription_id: sub.id,
            next_billing_date: next_billing,
            message: "subscription reactivated",
        })
    }

    /// Swap the current plan for a new dose without double-billing the
    /// unused remainder of the current period.
    ///
    /// The old subscription is scheduled to cancel at its period end
    /// rather than canceled immediately, so the old (scheduled) and new
    /// (trialing) subscriptions intentionally overlap until the
    /// boundary.
    async fn dosage_change(
        &self,
        req: &CheckoutRequest,
        profile: &ProfileRow,
    ) -> Result<CheckoutOutcome, BillingError> {
        let customer_id = profile
            .stripe_customer_id
            .clone()
            .ok_or(BillingError::MissingCustomerId)?;
        let old_subscription_id = profile
            .stripe_subscription_id
            .clone()
            .ok_or(BillingError::MissingSubscriptionId)?;

        let now = Utc::now();
        let category = Category::classify(&req.product_name, &req.product_category);
        let previous_plan = self
            .plans
            .get(profile.id, category)
            .await?
            .map(|p| p.plan_name);

        // Non-destructive: the user keeps service through what they
        // already paid for.
        self.provider
            .set_cancel_at_period_end(&old_subscription_id, true)
            .await?;

        let boundary = trial_boundary(profile.current_sub_end_date, now);

        let sub = self
            .provider
            .create_subscription(NewSubscription {
                customer_id,
                payment_method_id: profile.default_payment_method_id.clone(),
                plan_name: req.product_name.clone(),
                amount_cents: req.product_price,
                currency: self.config.currency.clone(),
                trial_end: Some(boundary),
                metadata: SubscriptionMetadata {
                    user_id: req.user_id,
                    category,
                    plan_name: req.product_name.clone(),
                    previous_plan,
                },
                idempotency_key: dosage_key(req, boundary),
            })
            .await?;

        let next_billing = sub.next_billing_date();

        self.plans.upsert(profile.id, category, &req.product_name).await?;
        self.profiles.set_subscription(profile.id, &sub.id, &sub.status).await?;
        self.profiles.advance_sub_end_date(profile.id, next_billing).await?;

        if let Some(form_id) = req.form_submission_id {
            self.form_submissions.approve(form_id).await?;
        }

        self.mailer
            .send(&templates::dosage_change(
                &profile.email,
                &profile.first_name,
                &req.product_name,
                next_billing,
            ))
            .await?;

        info!(
            old_subscription_id = %old_subscription_id,
            subscription_id = %sub.id,
            next_billing = %next_billing,
            "Dosage change completed"
        );

        Ok(CheckoutOutcome {
            subscription_id: sub.id,
            next_billing_date: next_billing,
            message: "dosage change completed",
        })
    }

    /// First purchase of a plan. A discounted first period is charged
    /// as a one-time payment, with the recurring subscription trialing
    /// for one calendar month so the user is not double-charged.
    async fn new_purchase(
        &self,
        req: &CheckoutRequest,
        profile: &ProfileRow,
    ) -> Result<CheckoutOutcome, BillingError> {
        let customer_id = profile
            .stripe_customer_id
            .clone()
            .ok_or(BillingError::MissingCustomerId)?;
        let payment_method_id = profile
            .default_payment_method_id
            .clone()
            .ok_or(BillingError::MissingPaymentMethod)?;
        let form_id = req
            .form_submission_id
            .ok_or(BillingError::MissingField("form_submission_id"))?;

        let now = Utc::now();
        let category = Category::classify(&req.product_name, &req.product_category);
        let discounted = req.real_price.is_some_and(|full| req.product_price < full);
        let recurring_amount = match req.real_price {
            Some(full) if full > 0 => full,
            _ => req.product_price,
        };

        if discounted {
            self.provider
                .charge_once(OneTimeCharge {
                    customer_id: customer_id.clone(),
                    payment_method_id: payment_method_id.clone(),
                    amount_cents: req.product_price,
                    currency: self.config.currency.clone(),
                    user_id: req.user_id,
                    idempotency_key: format!("charge-{form_id}"),
                })
                .await?;
        }

        let trial_end = discounted.then(|| first_month_trial_end(now));

        let sub = self
            .provider
            .create_subscription(NewSubscription {
                customer_id,
                payment_method_id: Some(payment_method_id),
                plan_name: req.product_name.clone(),
                amount_cents: recurring_amount,
                currency: self.config.currency.clone(),
                trial_end,
                metadata: SubscriptionMetadata {
                    user_id: req.user_id,
                    category,
                    plan_name: req.product_name.clone(),
                    previous_plan: None,
                },
                idempotency_key: format!("sub-{form_id}"),
            })
            .await?;

        // Provider-side signal of insufficient funds / requires-action:
        // the whole operation fails, no order or approval is recorded.
        if sub.status == "incomplete" {
            return Err(BillingError::PaymentFailed(
                "subscription left incomplete by provider".to_string(),
            ));
        }

        let next_billing = sub.next_billing_date();

        self.plans.upsert(profile.id, category, &req.product_name).await?;
        self.profiles.set_subscription(profile.id, &sub.id, &sub.status).await?;
        self.profiles.set_subscribe_status(profile.id, true).await?;
        self.profiles.advance_sub_end_date(profile.id, next_billing).await?;

        self.orders
            .create(CreateOrder {
                id: Uuid::new_v4(),
                profile_id: profile.id,
                plan_name: req.product_name.clone(),
                price_cents: req.product_price,
                shipping_address: req.shipping_address.clone(),
                payment_status: PaymentStatus::Completed.to_string(),
                form_submission_id: Some(form_id),
                is_renewal: false,
            })
            .await?;

        self.form_submissions.approve(form_id).await?;

        self.mailer
            .send(&templates::welcome(
                &profile.email,
                &profile.first_name,
                &req.product_name,
                req.product_price,
                next_billing,
            ))
            .await?;

        info!(subscription_id = %sub.id, next_billing = %next_billing, "Subscription created");

        Ok(CheckoutOutcome {
            subscription_id: sub.id,
            next_billing_date: next_billing,
            message: "subscription created",
        })
    }

    // =========================================================================
    // Webhook event path
    // =========================================================================

    /// Verify and process a provider webhook delivery
    #[instrument(skip(self, payload, signature))]
    pub async fn process_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<(), BillingError> {
        let event = self.webhook.verify_and_parse(payload, signature)?;

        match (&event.event_type, event.data) {
            (WebhookEventType::ChargeSucceeded, WebhookEventData::Charge(charge)) => {
                self.handle_charge(charge, true).await
            }
            (WebhookEventType::ChargeFailed, WebhookEventData::Charge(charge)) => {
                self.handle_charge(charge, false).await
            }
            (WebhookEventType::InvoicePaymentSucceeded, WebhookEventData::Invoice(invoice)) => {
                self.handle_invoice_paid(invoice).await
            }
            (WebhookEventType::InvoicePaymentFailed, WebhookEventData::Invoice(invoice)) => {
                self.handle_invoice_failed(invoice).await
            }
            (WebhookEventType::CustomerSubscriptionDeleted, WebhookEventData::Subscription(sub)) => {
                let profile = self
                    .profiles
                    .find_by_stripe_customer_id(&sub.customer_id)
                    .await?
                    .ok_or(BillingError::ProfileNotFound)?;
                self.profiles.set_subscribe_status(profile.id, false).await?;
                info!(subscription_id = %sub.subscription_id, "Subscription deleted; profile unsubscribed");
                Ok(())
            }
            (WebhookEventType::Unknown(event_type), _) => {
                debug!(event_type = %event_type, "Ignoring unhandled webhook event");
                Ok(())
            }
            _ => {
                warn!(event_id = %event.id, "Webhook event type and payload shape disagree");
                Ok(())
            }
        }
    }

    /// Charge events carry flat fees (dosage-change request fee,
    /// eligibility verification fee) and renewal failures.
    async fn handle_charge(&self, charge: ChargeData, success: bool) -> Result<(), BillingError> {
        let Some(user_id) = charge.user_id else {
            warn!(charge_id = %charge.charge_id, "Charge event without user metadata; skipping");
            return Ok(());
        };

        let profile = self
            .profiles
            .find_by_id(user_id.0)
            .await?
            .ok_or(BillingError::ProfileNotFound)?;

        if let Some(fee_name) = self.config.flat_fee_name(charge.amount_cents) {
            let inserted = self
                .billing_history
                .insert(CreateBillingEntry {
                    id: Uuid::new_v4(),
                    profile_id: profile.id,
                    external_id: charge.charge_id.clone(),
                    amount_cents: charge.amount_cents,
                    currency: charge.currency.clone(),
                    description: fee_name.to_string(),
                    billed_at: Utc::now(),
                    success,
                    recurring: false,
                    period_start: None,
                    period_end: None,
                })
                .await?;

            if inserted {
                self.mailer
                    .send(&templates::flat_fee(
                        &profile.email,
                        &profile.first_name,
                        fee_name,
                        charge.amount_cents,
                        success,
                    ))
                    .await?;
            }
            return Ok(());
        }

        let fee_ceiling = self.config.dosage_fee_cents.max(self.config.eligibility_fee_cents);
        if !success && charge.amount_cents > fee_ceiling {
            // A failed charge above the flat fees is a failed renewal.
            // Keyed on the invoice id when deduping so this and the
            // invoice.payment_failed handler collapse into one row.
            let external_id = if self.config.dedupe_invoice_events {
                charge.invoice_id.clone().unwrap_or_else(|| charge.charge_id.clone())
            } else {
                charge.charge_id.clone()
            };

            self.billing_history
                .insert(CreateBillingEntry {
                    id: Uuid::new_v4(),
                    profile_id: profile.id,
                    external_id,
                    amount_cents: charge.amount_cents,
                    currency: charge.currency.clone(),
                    description: "subscription renewal payment failed".to_string(),
                    billed_at: Utc::now(),
                    success: false,
                    recurring: true,
                    period_start: None,
                    period_end: None,
                })
                .await?;

            // The email is keyed on the flag transition, not the row
            // insert: the invoice handler may have recorded the row
            // first, but only this handler flips the flag, so the user
            // is notified exactly once whichever signal arrives first.
            let newly_flagged = !profile.payment_failed;

            self.profiles
                .set_payment_failed(profile.id, true, Utc::now())
                .await?;

            if newly_flagged {
                self.mailer
                    .send(&templates::payment_failed(
                        &profile.email,
                        &profile.first_name,
                        charge.amount_cents,
                    ))
                    .await?;
            }
            return Ok(());
        }

        debug!(
            charge_id = %charge.charge_id,
            amount = charge.amount_cents,
            "Charge outside flat fees; invoice handlers own it"
        );
        Ok(())
    }

    /// A paid invoice advances the paid-through boundary; a paid
    /// renewal additionally clones the latest order for fulfillment.
    async fn handle_invoice_paid(&self, invoice: InvoiceData) -> Result<(), BillingError> {
        let profile = self
            .profiles
            .find_by_stripe_customer_id(&invoice.customer_id)
            .await?
            .ok_or(BillingError::ProfileNotFound)?;

        let description = if invoice.is_subscription_create() {
            "subscription started"
        } else {
            "subscription renewed"
        };

        let inserted = self
            .billing_history
            .insert(CreateBillingEntry {
                id: Uuid::new_v4(),
                profile_id: profile.id,
                external_id: invoice.invoice_id.clone(),
                amount_cents: invoice.amount_cents,
                currency: invoice.currency.clone(),
                description: description.to_string(),
                billed_at: Utc::now(),
                success: true,
                recurring: true,
                period_start: Some(invoice.period_start),
                period_end: Some(invoice.period_end),
            })
            .await?;

        self.profiles
            .advance_sub_end_date(profile.id, invoice.period_end)
            .await?;
        self.profiles
            .set_payment_failed(profile.id, false, Utc::now())
            .await?;

        if !invoice.is_subscription_create() && inserted {
            match self.orders.find_latest_for_profile(profile.id).await? {
                Some(previous) => {
                    self.orders
                        .create(CreateOrder {
                            id: Uuid::new_v4(),
                            profile_id: profile.id,
                            plan_name: previous.plan_name,
                            price_cents: invoice.amount_cents,
                            shipping_address: previous.shipping_address,
                            payment_status: PaymentStatus::Completed.to_string(),
                            form_submission_id: previous.form_submission_id,
                            is_renewal: true,
                        })
                        .await?;
                }
                None => {
                    warn!(profile_id = %profile.id, "Renewal invoice with no prior order to clone");
                }
            }

            self.mailer
                .send(&templates::renewal(
                    &profile.email,
                    &profile.first_name,
                    invoice.amount_cents,
                    invoice.period_end,
                ))
                .await?;
        }

        Ok(())
    }

    /// Failed invoices are recorded in the ledger only; the profile
    /// flag and the user-facing email are owned by the charge.failed
    /// handler for the same underlying failure.
    async fn handle_invoice_failed(&self, invoice: InvoiceData) -> Result<(), BillingError> {
        let profile = self
            .profiles
            .find_by_stripe_customer_id(&invoice.customer_id)
            .await?
            .ok_or(BillingError::ProfileNotFound)?;

        if self.config.dedupe_invoice_events
            && self
                .billing_history
                .exists_by_external_id(&invoice.invoice_id)
                .await?
        {
            debug!(invoice_id = %invoice.invoice_id, "Failed invoice already recorded; skipping");
            return Ok(());
        }

        self.billing_history
            .insert(CreateBillingEntry {
                id: Uuid::new_v4(),
                profile_id: profile.id,
                external_id: invoice.invoice_id.clone(),
                amount_cents: invoice.amount_cents,
                currency: invoice.currency.clone(),
                description: "subscription renewal payment failed".to_string(),
                billed_at: Utc::now(),
                success: false,
                recurring: true,
                period_start: Some(invoice.period_start),
                period_end: Some(invoice.period_end),
            })
            .await?;

        Ok(())
    }
}

fn reactivation_key(req: &CheckoutRequest, boundary: DateTime<Utc>) -> String {
    match req.form_submission_id {
        Some(form_id) => format!("react-{form_id}"),
        None => format!("react-{}-{}", req.user_id, boundary.timestamp()),
    }
}

fn dosage_key(req: &CheckoutRequest, boundary: DateTime<Utc>) -> String {
    match req.form_submission_id {
        Some(form_id) => format!("dose-{form_id}"),
        None => format!("dose-{}-{}", req.user_id, boundary.timestamp()),
    }
}
