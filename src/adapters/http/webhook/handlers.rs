//! HTTP handlers for notification endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::handlers::subscription::{
    GetNotificationHistoryHandler, GetNotificationHistoryQuery, GetProcessingHealthHandler,
    GetProcessingHealthQuery, HealthSettings, ProcessNotificationCommand,
    ProcessNotificationHandler,
};
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::notification::{SignedPayloadVerifier, WebhookError};
use crate::domain::subscription::LifecyclePolicy;
use crate::ports::{NotificationLog, PlanCatalog, SubscriptionRepository};

use super::dto::{
    AcknowledgedResponse, ErrorResponse, HealthQueryParams, NotificationHistoryResponse,
    NotificationRecordResponse, SignedPayloadRequest,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// This struct is cloned for each request and contains Arc-wrapped dependencies
/// for efficient sharing across handlers.
#[derive(Clone)]
pub struct WebhookAppState {
    pub verifier: Arc<SignedPayloadVerifier>,
    pub plan_catalog: Arc<dyn PlanCatalog>,
    pub subscription_repository: Arc<dyn SubscriptionRepository>,
    pub notification_log: Arc<dyn NotificationLog>,
    pub lifecycle_policy: LifecyclePolicy,
    pub write_timeout: Duration,
    pub health: HealthSettings,
}

impl WebhookAppState {
    pub fn process_notification_handler(&self) -> ProcessNotificationHandler {
        ProcessNotificationHandler::new(
            self.verifier.clone(),
            self.plan_catalog.clone(),
            self.subscription_repository.clone(),
            self.notification_log.clone(),
            self.lifecycle_policy,
            self.write_timeout,
        )
    }

    pub fn health_handler(&self) -> GetProcessingHealthHandler {
        GetProcessingHealthHandler::new(self.notification_log.clone(), self.health)
    }

    pub fn history_handler(&self) -> GetNotificationHistoryHandler {
        GetNotificationHistoryHandler::new(self.notification_log.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhook - Process a signed lifecycle notification
pub async fn receive_notification(
    State(state): State<WebhookAppState>,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let raw_body = String::from_utf8_lossy(&body).into_owned();
    let cmd = ProcessNotificationCommand {
        signed_payload: SignedPayloadRequest::extract(&raw_body),
        raw_body,
    };

    state.process_notification_handler().handle(cmd).await?;

    Ok((StatusCode::OK, Json(AcknowledgedResponse::ok())))
}

/// GET /health - Processing health over a trailing window
pub async fn get_processing_health(
    State(state): State<WebhookAppState>,
    Query(params): Query<HealthQueryParams>,
) -> Result<impl IntoResponse, QueryApiError> {
    let report = state
        .health_handler()
        .handle(GetProcessingHealthQuery {
            window_hours: params.window_hours,
        })
        .await?;

    Ok(Json(report))
}

/// GET /notifications/:original_transaction_id - Audit history of a subscription
pub async fn get_notification_history(
    State(state): State<WebhookAppState>,
    Path(original_transaction_id): Path<String>,
) -> Result<impl IntoResponse, QueryApiError> {
    let records = state
        .history_handler()
        .handle(GetNotificationHistoryQuery {
            original_transaction_id: original_transaction_id.clone(),
        })
        .await?;

    Ok(Json(NotificationHistoryResponse {
        original_transaction_id,
        records: records
            .into_iter()
            .map(NotificationRecordResponse::from)
            .collect(),
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// Converts processing failures to HTTP responses.
///
/// Failures acknowledged with a 2xx keep the success body so the sender does
/// not treat them as errors.
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.status_code();
        if status.is_success() {
            return (status, Json(AcknowledgedResponse::ok())).into_response();
        }

        if status.is_server_error() {
            tracing::error!(retryable = self.0.is_retryable(), "Notification processing failed: {}", self.0);
        } else {
            tracing::warn!("Notification rejected: {}", self.0);
        }

        (status, Json(ErrorResponse::new(self.0.to_string()))).into_response()
    }
}

/// Converts query failures to HTTP responses.
pub struct QueryApiError(DomainError);

impl From<DomainError> for QueryApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for QueryApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.0.code {
            ErrorCode::ValidationFailed => StatusCode::BAD_REQUEST,
            _ => {
                tracing::error!("Query failed: {}", self.0);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ErrorResponse::new(self.0.message))).into_response()
    }
}
