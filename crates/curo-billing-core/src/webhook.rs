//! Stripe webhook handling
//!
//! Signature verification plus typed parsing for the events the
//! orchestrator acts on. Unverified events never reach a handler.

use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, error, info, warn};

use curo_types::UserId;

use crate::error::BillingError;

/// Webhook event types we handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventType {
    /// Charge succeeded
    ChargeSucceeded,
    /// Charge failed
    ChargeFailed,
    /// Invoice paid (subscription create or renewal)
    InvoicePaymentSucceeded,
    /// Invoice payment failed
    InvoicePaymentFailed,
    /// Customer subscription deleted
    CustomerSubscriptionDeleted,
    /// Unknown event type
    Unknown(String),
}

impl From<&str> for WebhookEventType {
    fn from(s: &str) -> Self {
        match s {
            "charge.succeeded" => Self::ChargeSucceeded,
            "charge.failed" => Self::ChargeFailed,
            "invoice.payment_succeeded" => Self::InvoicePaymentSucceeded,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            "customer.subscription.deleted" => Self::CustomerSubscriptionDeleted,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Parsed webhook event
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    /// Event ID
    pub id: String,
    /// Event type
    pub event_type: WebhookEventType,
    /// Event data
    pub data: WebhookEventData,
    /// When the event was created (Unix timestamp)
    pub created: i64,
}

/// Webhook event data
#[derive(Debug, Clone)]
pub enum WebhookEventData {
    /// Charge data
    Charge(ChargeData),
    /// Invoice data
    Invoice(InvoiceData),
    /// Subscription data
    Subscription(SubscriptionEventData),
    /// Raw JSON for unknown events
    Raw(serde_json::Value),
}

/// Charge event data
#[derive(Debug, Clone)]
pub struct ChargeData {
    /// Charge ID
    pub charge_id: String,
    /// Amount in cents
    pub amount_cents: i64,
    /// Currency
    pub currency: String,
    /// User the charge was made for, from charge metadata
    pub user_id: Option<UserId>,
    /// Invoice this charge settles, when it belongs to a subscription
    pub invoice_id: Option<String>,
    /// Provider failure message for failed charges
    pub failure_message: Option<String>,
}

/// Invoice event data
#[derive(Debug, Clone)]
pub struct InvoiceData {
    /// Invoice ID
    pub invoice_id: String,
    /// Customer ID
    pub customer_id: String,
    /// Subscription ID
    pub subscription_id: Option<String>,
    /// Why the invoice was created ("subscription_create",
    /// "subscription_cycle", ...)
    pub billing_reason: Option<String>,
    /// Amount in cents
    pub amount_cents: i64,
    /// Currency
    pub currency: String,
    /// Coverage period start (from the first line item)
    pub period_start: DateTime<Utc>,
    /// Coverage period end (from the first line item)
    pub period_end: DateTime<Utc>,
}

impl InvoiceData {
    /// Whether this invoice is the first invoice of a new subscription
    pub fn is_subscription_create(&self) -> bool {
        self.billing_reason.as_deref() == Some("subscription_create")
    }
}

/// Subscription lifecycle event data
#[derive(Debug, Clone)]
pub struct SubscriptionEventData {
    /// Subscription ID
    pub subscription_id: String,
    /// Customer ID
    pub customer_id: String,
    /// Status
    pub status: String,
}

/// Webhook handler for verifying and parsing Stripe events
#[derive(Clone)]
pub struct WebhookHandler {
    webhook_secret: String,
}

impl WebhookHandler {
    /// Create a new webhook handler
    pub fn new(webhook_secret: impl Into<String>) -> Self {
        Self {
            webhook_secret: webhook_secret.into(),
        }
    }

    /// Verify and parse a webhook payload
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, BillingError> {
        self.verify_signature(payload, signature)?;

        let raw_event: RawStripeEvent = serde_json::from_slice(payload)
            .map_err(|e| BillingError::WebhookError(e.to_string()))?;

        debug!(event_id = %raw_event.id, event_type = %raw_event.event_type, "Parsed webhook event");

        let event_type = WebhookEventType::from(raw_event.event_type.as_str());
        let data = Self::parse_event_data(&event_type, raw_event.data.object)?;

        Ok(WebhookEvent {
            id: raw_event.id,
            event_type,
            data,
            created: raw_event.created,
        })
    }

    /// Verify Stripe webhook signature
    fn verify_signature(&self, payload: &[u8], signature: &str) -> Result<(), BillingError> {
        // Parse signature header: t=timestamp,v1=signature
        let mut timestamp: Option<&str> = None;
        let mut sig_v1: Option<&str> = None;

        for part in signature.split(',') {
            if let Some((key, value)) = part.split_once('=') {
                match key {
                    "t" => timestamp = Some(value),
                    "v1" => sig_v1 = Some(value),
                    _ => {}
                }
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            warn!("Missing timestamp in webhook signature");
            BillingError::WebhookError("Missing timestamp".to_string())
        })?;

        let sig_v1 = sig_v1.ok_or_else(|| {
            warn!("Missing v1 signature in webhook signature");
            BillingError::WebhookError("Missing signature".to_string())
        })?;

        // Build signed payload
        let signed_payload = format!(
            "{}.{}",
            timestamp,
            std::str::from_utf8(payload)
                .map_err(|_| BillingError::WebhookError("Invalid payload encoding".to_string()))?
        );

        // Compute expected signature
        let mut mac = Hmac::<Sha256>::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| BillingError::Internal("HMAC error".to_string()))?;
        mac.update(signed_payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        // Compare signatures (constant-time)
        if !constant_time_eq(sig_v1.as_bytes(), expected.as_bytes()) {
            error!("Webhook signature verification failed");
            return Err(BillingError::WebhookError(
                "Signature verification failed".to_string(),
            ));
        }

        // Check timestamp freshness (within 5 minutes)
        let ts: i64 = timestamp
            .parse()
            .map_err(|_| BillingError::WebhookError("Invalid timestamp format".to_string()))?;
        let now = Utc::now().timestamp();
        if (now - ts).abs() > 300 {
            warn!(timestamp = ts, now = now, "Webhook timestamp too old");
            return Err(BillingError::WebhookError("Timestamp too old".to_string()));
        }

        Ok(())
    }

    /// Parse event data based on type
    fn parse_event_data(
        event_type: &WebhookEventType,
        object: serde_json::Value,
    ) -> Result<WebhookEventData, BillingError> {
        match event_type {
            WebhookEventType::ChargeSucceeded | WebhookEventType::ChargeFailed => {
                let charge: RawCharge = serde_json::from_value(object)
                    .map_err(|e| BillingError::WebhookError(e.to_string()))?;
                let user_id = charge
                    .metadata
                    .as_ref()
                    .and_then(|m| m.user_id.as_deref())
                    .and_then(|s| UserId::parse(s).ok());
                Ok(WebhookEventData::Charge(ChargeData {
                    charge_id: charge.id,
                    amount_cents: charge.amount,
                    currency: charge.currency,
                    user_id,
                    invoice_id: charge.invoice,
                    failure_message: charge.failure_message,
                }))
            }
            WebhookEventType::InvoicePaymentSucceeded | WebhookEventType::InvoicePaymentFailed => {
                let inv: RawInvoice = serde_json::from_value(object)
                    .map_err(|e| BillingError::WebhookError(e.to_string()))?;

                // Coverage period comes from the first line item; fall
                // back to the invoice-level period.
                let line_period = inv.lines.as_ref().and_then(|l| l.data.first()).map(|l| l.period);
                let (start, end) = match line_period {
                    Some(p) => (p.start, p.end),
                    None => (inv.period_start, inv.period_end),
                };

                let amount = if inv.amount_paid > 0 {
                    inv.amount_paid
                } else {
                    inv.amount_due
                };

                Ok(WebhookEventData::Invoice(InvoiceData {
                    invoice_id: inv.id,
                    customer_id: inv.customer,
                    subscription_id: inv.subscription,
                    billing_reason: inv.billing_reason,
                    amount_cents: amount,
                    currency: inv.currency,
                    period_start: to_utc(start),
                    period_end: to_utc(end),
                }))
            }
            WebhookEventType::CustomerSubscriptionDeleted => {
                let sub: RawSubscription = serde_json::from_value(object)
                    .map_err(|e| BillingError::WebhookError(e.to_string()))?;
                Ok(WebhookEventData::Subscription(SubscriptionEventData {
                    subscription_id: sub.id,
                    customer_id: sub.customer,
                    status: sub.status,
                }))
            }
            WebhookEventType::Unknown(_) => {
                info!("Received unknown webhook event type");
                Ok(WebhookEventData::Raw(object))
            }
        }
    }
}

fn to_utc(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts, 0).single().unwrap_or_else(Utc::now)
}

/// Constant-time comparison
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

// Raw Stripe event shapes for parsing

#[derive(Debug, Deserialize)]
struct RawStripeEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
    created: i64,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RawCharge {
    id: String,
    amount: i64,
    currency: String,
    metadata: Option<RawChargeMetadata>,
    invoice: Option<String>,
    failure_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawChargeMetadata {
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawInvoice {
    id: String,
    customer: String,
    subscription: Option<String>,
    billing_reason: Option<String>,
    #[serde(default)]
    amount_paid: i64,
    #[serde(default)]
    amount_due: i64,
    currency: String,
    #[serde(default)]
    period_start: i64,
    #[serde(default)]
    period_end: i64,
    lines: Option<RawInvoiceLines>,
}

#[derive(Debug, Deserialize)]
struct RawInvoiceLines {
    data: Vec<RawInvoiceLine>,
}

#[derive(Debug, Deserialize)]
struct RawInvoiceLine {
    period: RawPeriod,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct RawPeriod {
    start: i64,
    end: i64,
}

#[derive(Debug, Deserialize)]
struct RawSubscription {
    id: String,
    customer: String,
    status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let signed = format!("{}.{}", timestamp, std::str::from_utf8(payload).unwrap());
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signed.as_bytes());
        format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    fn charge_event(amount: i64) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "id": "evt_1",
            "type": "charge.succeeded",
            "created": Utc::now().timestamp(),
            "data": { "object": {
                "id": "ch_1",
                "amount": amount,
                "currency": "usd",
                "metadata": { "user_id": "8b6f24f1-5a54-4f4e-9a87-176b9d0c8a11" },
                "invoice": null,
                "failure_message": null
            }}
        }))
        .unwrap()
    }

    #[test]
    fn test_verify_and_parse_with_valid_signature() {
        let handler = WebhookHandler::new("whsec_test");
        let payload = charge_event(2500);
        let sig = sign(&payload, "whsec_test", Utc::now().timestamp());

        let event = handler.verify_and_parse(&payload, &sig).unwrap();
        assert_eq!(event.event_type, WebhookEventType::ChargeSucceeded);
        match event.data {
            WebhookEventData::Charge(c) => {
                assert_eq!(c.amount_cents, 2500);
                assert!(c.user_id.is_some());
            }
            other => panic!("unexpected data: {other:?}"),
        }
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let handler = WebhookHandler::new("whsec_test");
        let payload = charge_event(2500);
        let sig = sign(&payload, "whsec_wrong", Utc::now().timestamp());

        assert!(handler.verify_and_parse(&payload, &sig).is_err());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let handler = WebhookHandler::new("whsec_test");
        let payload = charge_event(2500);
        let sig = sign(&payload, "whsec_test", Utc::now().timestamp() - 600);

        assert!(handler.verify_and_parse(&payload, &sig).is_err());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let handler = WebhookHandler::new("whsec_test");
        let payload = charge_event(2500);
        let sig = sign(&payload, "whsec_test", Utc::now().timestamp());

        let tampered = charge_event(9900);
        assert!(handler.verify_and_parse(&tampered, &sig).is_err());
    }

    #[test]
    fn test_invoice_line_period_preferred() {
        let handler = WebhookHandler::new("whsec_test");
        let payload = serde_json::to_vec(&serde_json::json!({
            "id": "evt_2",
            "type": "invoice.payment_succeeded",
            "created": Utc::now().timestamp(),
            "data": { "object": {
                "id": "in_1",
                "customer": "cus_1",
                "subscription": "sub_1",
                "billing_reason": "subscription_cycle",
                "amount_paid": 29900,
                "amount_due": 29900,
                "currency": "usd",
                "period_start": 100,
                "period_end": 200,
                "lines": { "data": [ { "period": { "start": 1000, "end": 2000 } } ] }
            }}
        }))
        .unwrap();
        let sig = sign(&payload, "whsec_test", Utc::now().timestamp());

        let event = handler.verify_and_parse(&payload, &sig).unwrap();
        match event.data {
            WebhookEventData::Invoice(inv) => {
                assert_eq!(inv.period_end.timestamp(), 2000);
                assert!(!inv.is_subscription_create());
            }
            other => panic!("unexpected data: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_event_parses_as_raw() {
        let handler = WebhookHandler::new("whsec_test");
        let payload = serde_json::to_vec(&serde_json::json!({
            "id": "evt_3",
            "type": "customer.updated",
            "created": Utc::now().timestamp(),
            "data": { "object": { "id": "cus_1" } }
        }))
        .unwrap();
        let sig = sign(&payload, "whsec_test", Utc::now().timestamp());

        let event = handler.verify_and_parse(&payload, &sig).unwrap();
        assert!(matches!(event.event_type, WebhookEventType::Unknown(_)));
    }
}
