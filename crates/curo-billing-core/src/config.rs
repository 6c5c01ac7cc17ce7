//! Billing configuration

/// Billing service configuration
#[derive(Debug, Clone)]
pub struct BillingConfig {
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook secret
    pub stripe_webhook_secret: String,
    /// Currency code for all charges
    pub currency: String,
    /// Flat fee charged for a dosage-change request, in cents
    pub dosage_fee_cents: i64,
    /// Flat fee charged for eligibility verification, in cents
    pub eligibility_fee_cents: i64,
    /// Collapse the two independent failed-renewal webhook signals
    /// (`invoice.payment_failed` and the oversized `charge.failed`)
    /// into one ledger row and one email, keyed on the invoice id
    pub dedupe_invoice_events: bool,
}

impl BillingConfig {
    /// Create a new billing config with defaults
    pub fn new(
        stripe_secret_key: impl Into<String>,
        stripe_webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            stripe_secret_key: stripe_secret_key.into(),
            stripe_webhook_secret: stripe_webhook_secret.into(),
            currency: "usd".to_string(),
            dosage_fee_cents: 2_500,
            eligibility_fee_cents: 4_900,
            dedupe_invoice_events: true,
        }
    }

    /// Override the flat fee amounts
    pub fn with_fees(mut self, dosage_cents: i64, eligibility_cents: i64) -> Self {
        self.dosage_fee_cents = dosage_cents;
        self.eligibility_fee_cents = eligibility_cents;
        self
    }

    /// Toggle failed-renewal event deduplication
    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe_invoice_events = dedupe;
        self
    }

    /// Override the currency
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Name of the flat fee matching an amount, if any
    pub fn flat_fee_name(&self, amount_cents: i64) -> Option<&'static str> {
        if amount_cents == self.dosage_fee_cents {
            Some("dosage change fee")
        } else if amount_cents == self.eligibility_fee_cents {
            Some("eligibility verification fee")
        } else {
            None
        }
    }
}
