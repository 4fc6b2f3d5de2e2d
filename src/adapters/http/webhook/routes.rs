//! Axum router configuration for notification endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    get_notification_history, get_processing_health, receive_notification, WebhookAppState,
};

/// Create the notification router.
///
/// # Routes
///
/// - `POST /webhook` - Signed lifecycle notification (verified by certificate chain)
/// - `GET /health` - Processing health report
/// - `GET /notifications/:original_transaction_id` - Audit history of a subscription
pub fn webhook_router() -> Router<WebhookAppState> {
    Router::new()
        .route("/webhook", post(receive_notification))
        .route("/health", get(get_processing_health))
        .route(
            "/notifications/:original_transaction_id",
            get(get_notification_history),
        )
}
