//! Message builders for every notification the platform sends
//!
//! Each builder returns a ready-to-send [`Email`]. Amounts are cents;
//! dates are rendered as a human calendar date so the recipient sees
//! the exact next-billing boundary the orchestrator computed.

use chrono::{DateTime, Utc};

use crate::mailer::Email;

fn dollars(cents: i64) -> String {
    // Provider-sent credits arrive as negative amounts; keep the sign
    // out of the split so the cents never render as "-05".
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    format!("{sign}${}.{:02}", cents / 100, cents % 100)
}

fn date(at: DateTime<Utc>) -> String {
    at.format("%B %-d, %Y").to_string()
}

/// Welcome email after a successful new purchase
pub fn welcome(
    to: &str,
    first_name: &str,
    plan_name: &str,
    charged_cents: i64,
    next_billing: DateTime<Utc>,
) -> Email {
    let subject = format!("Welcome to your {plan_name} plan");
    let text = format!(
        "Hi {first_name},\n\nYour {plan_name} plan is active. We charged {} today; \
         your next billing date is {}.\n\nThe Curo Team",
        dollars(charged_cents),
        date(next_billing),
    );
    let html = format!(
        "<p>Hi {first_name},</p><p>Your <strong>{plan_name}</strong> plan is active. \
         We charged {} today; your next billing date is <strong>{}</strong>.</p>\
         <p>The Curo Team</p>",
        dollars(charged_cents),
        date(next_billing),
    );
    Email::new(to, subject, html, text)
}

/// Welcome-back email after a reactivation
pub fn welcome_back(to: &str, first_name: &str, plan_name: &str, next_billing: DateTime<Utc>) -> Email {
    let subject = format!("Your {plan_name} plan is back");
    let text = format!(
        "Hi {first_name},\n\nYour {plan_name} plan has been reactivated. \
         You won't be charged until {}.\n\nThe Curo Team",
        date(next_billing),
    );
    let html = format!(
        "<p>Hi {first_name},</p><p>Your <strong>{plan_name}</strong> plan has been \
         reactivated. You won't be charged until <strong>{}</strong>.</p>\
         <p>The Curo Team</p>",
        date(next_billing),
    );
    Email::new(to, subject, html, text)
}

/// Confirmation after a dosage change
pub fn dosage_change(to: &str, first_name: &str, plan_name: &str, next_billing: DateTime<Utc>) -> Email {
    let subject = "Your dosage change is confirmed".to_string();
    let text = format!(
        "Hi {first_name},\n\nYour plan has been updated to {plan_name}. You keep your \
         current supply through what you've already paid for; billing at the new rate \
         starts {}.\n\nThe Curo Team",
        date(next_billing),
    );
    let html = format!(
        "<p>Hi {first_name},</p><p>Your plan has been updated to \
         <strong>{plan_name}</strong>. You keep your current supply through what \
         you've already paid for; billing at the new rate starts \
         <strong>{}</strong>.</p><p>The Curo Team</p>",
        date(next_billing),
    );
    Email::new(to, subject, html, text)
}

/// Renewal confirmation driven by a paid renewal invoice
pub fn renewal(to: &str, first_name: &str, amount_cents: i64, period_end: DateTime<Utc>) -> Email {
    let subject = "Your subscription has renewed".to_string();
    let text = format!(
        "Hi {first_name},\n\nYour subscription renewed for {}. You're covered \
         through {}.\n\nThe Curo Team",
        dollars(amount_cents),
        date(period_end),
    );
    let html = format!(
        "<p>Hi {first_name},</p><p>Your subscription renewed for {}. You're covered \
         through <strong>{}</strong>.</p><p>The Curo Team</p>",
        dollars(amount_cents),
        date(period_end),
    );
    Email::new(to, subject, html, text)
}

/// Payment-failed notice for a failed renewal
pub fn payment_failed(to: &str, first_name: &str, amount_cents: i64) -> Email {
    let subject = "We couldn't process your payment".to_string();
    let text = format!(
        "Hi {first_name},\n\nYour payment of {} didn't go through. Please update your \
         payment method to keep your plan active.\n\nThe Curo Team",
        dollars(amount_cents),
    );
    let html = format!(
        "<p>Hi {first_name},</p><p>Your payment of {} didn't go through. Please update \
         your payment method to keep your plan active.</p><p>The Curo Team</p>",
        dollars(amount_cents),
    );
    Email::new(to, subject, html, text)
}

/// Receipt or failure notice for a one-off flat fee
pub fn flat_fee(to: &str, first_name: &str, fee_name: &str, amount_cents: i64, success: bool) -> Email {
    let (subject, verb) = if success {
        (format!("Receipt: {fee_name}"), "was charged")
    } else {
        (format!("Payment failed: {fee_name}"), "could not be charged")
    };
    let text = format!(
        "Hi {first_name},\n\nYour {fee_name} of {} {verb}.\n\nThe Curo Team",
        dollars(amount_cents),
    );
    let html = format!(
        "<p>Hi {first_name},</p><p>Your {fee_name} of {} {verb}.</p><p>The Curo Team</p>",
        dollars(amount_cents),
    );
    Email::new(to, subject, html, text)
}

/// Eligibility-approved notice from the assessment funnel
pub fn eligibility(to: &str, first_name: &str) -> Email {
    let subject = "You're eligible for treatment".to_string();
    let text = format!(
        "Hi {first_name},\n\nGood news: a provider has reviewed your assessment and \
         you're eligible for treatment. You can complete checkout any time.\n\n\
         The Curo Team",
    );
    let html = format!(
        "<p>Hi {first_name},</p><p>Good news: a provider has reviewed your assessment \
         and you're eligible for treatment. You can complete checkout any time.</p>\
         <p>The Curo Team</p>",
    );
    Email::new(to, subject, html, text)
}

/// Shipping notice carrying the carrier tracking id
pub fn tracking(to: &str, first_name: &str, tracking_id: &str) -> Email {
    let subject = "Your order has shipped".to_string();
    let text = format!(
        "Hi {first_name},\n\nYour order is on its way. Tracking number: \
         {tracking_id}.\n\nThe Curo Team",
    );
    let html = format!(
        "<p>Hi {first_name},</p><p>Your order is on its way. Tracking number: \
         <strong>{tracking_id}</strong>.</p><p>The Curo Team</p>",
    );
    Email::new(to, subject, html, text)
}

/// Rejection notice from the clinical review
pub fn rejection(to: &str, first_name: &str) -> Email {
    let subject = "An update on your assessment".to_string();
    let text = format!(
        "Hi {first_name},\n\nAfter reviewing your assessment, our providers determined \
         this treatment isn't a fit right now. You have not been charged.\n\n\
         The Curo Team",
    );
    let html = format!(
        "<p>Hi {first_name},</p><p>After reviewing your assessment, our providers \
         determined this treatment isn't a fit right now. You have not been \
         charged.</p><p>The Curo Team</p>",
    );
    Email::new(to, subject, html, text)
}

/// Account-setup invitation with a one-time setup link
pub fn user_setup(to: &str, first_name: &str, setup_link: &str) -> Email {
    let subject = "Finish setting up your Curo account".to_string();
    let text = format!(
        "Hi {first_name},\n\nFinish setting up your account here: {setup_link}\n\n\
         The Curo Team",
    );
    let html = format!(
        "<p>Hi {first_name},</p><p><a href=\"{setup_link}\">Finish setting up your \
         account</a>.</p><p>The Curo Team</p>",
    );
    Email::new(to, subject, html, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_dollars_formatting() {
        assert_eq!(dollars(9900), "$99.00");
        assert_eq!(dollars(2505), "$25.05");
        assert_eq!(dollars(5), "$0.05");
    }

    #[test]
    fn test_dollars_negative_amounts() {
        assert_eq!(dollars(-105), "-$1.05");
        assert_eq!(dollars(-9900), "-$99.00");
        assert_eq!(dollars(0), "$0.00");
    }

    #[test]
    fn test_welcome_carries_amount_and_date() {
        let next = Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap();
        let email = welcome("u@example.com", "Ada", "Semaglutide Injection", 9900, next);
        assert!(email.text.contains("$99.00"));
        assert!(email.text.contains("March 14, 2026"));
        assert!(email.validate().is_ok());
    }

    #[test]
    fn test_flat_fee_success_vs_failure() {
        let ok = flat_fee("u@example.com", "Ada", "dosage change fee", 2500, true);
        assert!(ok.subject.starts_with("Receipt"));
        let bad = flat_fee("u@example.com", "Ada", "dosage change fee", 2500, false);
        assert!(bad.subject.starts_with("Payment failed"));
    }
}
