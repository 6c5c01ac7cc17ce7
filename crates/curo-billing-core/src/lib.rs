//! Curo Billing Core - Subscription orchestration
//!
//! Core checkout functionality: Stripe integration, the subscription
//! orchestrator (new purchase, dosage change, reactivation), and
//! webhook handling.
//!
//! # Example
//!
//! ```rust,ignore
//! use curo_billing_core::{BillingConfig, CheckoutService, StripeProvider};
//!
//! let config = BillingConfig::new("sk_test_...", "whsec_...");
//! let provider = StripeProvider::new(config.clone());
//! let service = CheckoutService::new(repos, provider, mailer, config);
//!
//! let outcome = service.process_request(request).await?;
//! ```

pub mod config;
pub mod error;
pub mod provider;
pub mod service;
pub mod stripe;
pub mod webhook;

pub use config::BillingConfig;
pub use error::BillingError;
pub use provider::{
    NewSubscription, OneTimeCharge, PaymentProvider, ProviderCharge, ProviderSubscription,
    SubscriptionMetadata,
};
pub use service::{
    first_month_trial_end, trial_boundary, CheckoutOutcome, CheckoutRequest, CheckoutService,
    RequestType,
};
pub use stripe::StripeProvider;
pub use webhook::{WebhookEvent, WebhookEventData, WebhookEventType, WebhookHandler};
