//! Notification dispatch handler

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use curo_notify::templates;
use curo_types::UserId;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Notification kinds the funnel and fulfillment systems can request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationType {
    Eligibility,
    TrackingId,
    Rejection,
    UserSetup,
}

impl NotificationType {
    /// Wire values as sent by the upstream systems
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "eligibility" => Some(Self::Eligibility),
            "TRACKING_ID" => Some(Self::TrackingId),
            "REJECTION" => Some(Self::Rejection),
            "USER_SETUP" => Some(Self::UserSetup),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eligibility => "eligibility",
            Self::TrackingId => "TRACKING_ID",
            Self::Rejection => "REJECTION",
            Self::UserSetup => "USER_SETUP",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NotificationBody {
    /// User id, camelCase on the wire for the storefront client
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    /// Accepted on the wire for compatibility; templates only use the
    /// first name
    #[allow(dead_code)]
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub tracking_id: Option<String>,
    pub setup_link: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub success: bool,
    pub sent_to: String,
    #[serde(rename = "type")]
    pub notification_type: &'static str,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/notifications
pub async fn send_notification(
    State(state): State<AppState>,
    Json(body): Json<NotificationBody>,
) -> ApiResult<Json<NotificationResponse>> {
    let start = Instant::now();

    let notification_type = NotificationType::parse(&body.notification_type).ok_or_else(|| {
        ApiError::BadRequest(format!("Unknown notification type: {}", body.notification_type))
    })?;

    // Resolve recipient: explicit email wins, otherwise look the
    // profile up by user id.
    let (email, first_name) = match (&body.email, &body.user_id) {
        (Some(email), _) => (
            email.clone(),
            body.first_name.clone().unwrap_or_default(),
        ),
        (None, Some(raw_id)) => {
            let user_id = UserId::parse(raw_id)
                .map_err(|_| ApiError::BadRequest("Invalid userId".to_string()))?;
            let profile = state
                .profiles
                .find_by_id(user_id.0)
                .await?
                .ok_or(ApiError::ProfileNotFound)?;
            let first_name = body.first_name.clone().unwrap_or(profile.first_name);
            (profile.email, first_name)
        }
        (None, None) => {
            return Err(ApiError::BadRequest(
                "Either email or userId is required".to_string(),
            ));
        }
    };

    let email_message = match notification_type {
        NotificationType::Eligibility => templates::eligibility(&email, &first_name),
        NotificationType::TrackingId => {
            let tracking_id = body.tracking_id.as_deref().ok_or_else(|| {
                ApiError::BadRequest("tracking_id is required for TRACKING_ID".to_string())
            })?;
            templates::tracking(&email, &first_name, tracking_id)
        }
        NotificationType::Rejection => templates::rejection(&email, &first_name),
        NotificationType::UserSetup => {
            let setup_link = body.setup_link.as_deref().ok_or_else(|| {
                ApiError::BadRequest("setup_link is required for USER_SETUP".to_string())
            })?;
            templates::user_setup(&email, &first_name, setup_link)
        }
    };

    state.mailer.send(&email_message).await?;

    metrics::counter!("notifications_sent_total", "type" => notification_type.as_str())
        .increment(1);
    metrics::histogram!("notify_operation_duration_seconds", "operation" => "send")
        .record(start.elapsed().as_secs_f64());

    tracing::info!(
        notification_type = notification_type.as_str(),
        sent_to = %email,
        "Notification sent"
    );

    Ok(Json(NotificationResponse {
        success: true,
        sent_to: email,
        notification_type: notification_type.as_str(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_type_wire_values() {
        assert_eq!(
            NotificationType::parse("eligibility"),
            Some(NotificationType::Eligibility)
        );
        assert_eq!(
            NotificationType::parse("TRACKING_ID"),
            Some(NotificationType::TrackingId)
        );
        assert_eq!(
            NotificationType::parse("REJECTION"),
            Some(NotificationType::Rejection)
        );
        assert_eq!(
            NotificationType::parse("USER_SETUP"),
            Some(NotificationType::UserSetup)
        );
    }

    #[test]
    fn test_unknown_notification_type_rejected() {
        assert_eq!(NotificationType::parse("eligibility "), None);
        assert_eq!(NotificationType::parse("tracking_id"), None);
        assert_eq!(NotificationType::parse(""), None);
    }
}
