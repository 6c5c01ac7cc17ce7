//! Checkout request handler

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

use curo_billing_core::{CheckoutRequest, RequestType};
use curo_types::UserId;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    /// User id, camelCase on the wire for the storefront client
    #[serde(rename = "userId")]
    pub user_id: String,
    pub product_name: String,
    /// Price charged this period, in cents
    pub product_price: i64,
    #[serde(default)]
    pub product_category: String,
    /// Full non-promotional monthly price, in cents
    pub real_price: Option<i64>,
    #[serde(default)]
    pub shipping_address: String,
    pub form_submission_id: Option<String>,
    #[serde(default)]
    pub request_type: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub success: bool,
    pub message: &'static str,
    pub subscription_id: String,
    pub next_billing_date: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/checkout
pub async fn checkout(
    State(state): State<AppState>,
    Json(body): Json<CheckoutBody>,
) -> ApiResult<Json<CheckoutResponse>> {
    let start = Instant::now();

    let user_id = UserId::parse(&body.user_id)
        .map_err(|_| ApiError::BadRequest("Invalid userId".to_string()))?;

    if body.product_name.trim().is_empty() {
        return Err(ApiError::BadRequest("product_name is required".to_string()));
    }
    if body.product_price <= 0 {
        return Err(ApiError::BadRequest(
            "product_price must be a positive amount in cents".to_string(),
        ));
    }

    let form_submission_id = match body.form_submission_id.as_deref() {
        Some(raw) => Some(
            Uuid::parse_str(raw)
                .map_err(|_| ApiError::BadRequest("Invalid form_submission_id".to_string()))?,
        ),
        None => None,
    };

    let request_type = RequestType::from(body.request_type.as_str());

    let outcome = state
        .checkout
        .process_request(CheckoutRequest {
            user_id,
            product_name: body.product_name,
            product_price: body.product_price,
            product_category: body.product_category,
            real_price: body.real_price,
            shipping_address: body.shipping_address,
            form_submission_id,
            request_type,
        })
        .await?;

    metrics::counter!("checkout_requests_total", "request_type" => request_type_label(request_type))
        .increment(1);
    metrics::histogram!("checkout_operation_duration_seconds", "operation" => "process_request")
        .record(start.elapsed().as_secs_f64());

    tracing::info!(
        user_id = %user_id,
        subscription_id = %outcome.subscription_id,
        "Checkout request processed"
    );

    Ok(Json(CheckoutResponse {
        success: true,
        message: outcome.message,
        subscription_id: outcome.subscription_id,
        next_billing_date: outcome.next_billing_date.to_rfc3339(),
    }))
}

fn request_type_label(request_type: RequestType) -> &'static str {
    match request_type {
        RequestType::NewPurchase => "new_purchase",
        RequestType::DosageChange => "dosage_change",
        RequestType::Reactivation => "reactivation",
    }
}
