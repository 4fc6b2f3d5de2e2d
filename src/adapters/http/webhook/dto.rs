//! HTTP DTOs for the notification endpoints.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::foundation::Timestamp;
use crate::domain::notification::{NotificationRecord, ProcessingStatus};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// JSON wire form of a notification delivery.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedPayloadRequest {
    pub signed_payload: String,
}

impl SignedPayloadRequest {
    /// Extracts the JWS from a request body.
    ///
    /// The body is either the compact JWS itself or `{"signedPayload": "..."}`.
    /// A body that is neither is passed through and fails decoding downstream.
    pub fn extract(body: &str) -> String {
        let trimmed = body.trim();
        if trimmed.starts_with('{') {
            if let Ok(request) = serde_json::from_str::<SignedPayloadRequest>(trimmed) {
                return request.signed_payload;
            }
        }
        trimmed.to_string()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthQueryParams {
    pub window_hours: Option<u32>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Acknowledgement body for accepted deliveries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcknowledgedResponse {
    pub success: bool,
}

impl AcknowledgedResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// One audit record in a history response.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationRecordResponse {
    pub id: Uuid,
    pub notification_id: Option<String>,
    pub event_kind: String,
    pub event_subtype: Option<String>,
    pub processing_status: ProcessingStatus,
    pub error_message: Option<String>,
    pub received_at: Timestamp,
}

impl From<NotificationRecord> for NotificationRecordResponse {
    fn from(record: NotificationRecord) -> Self {
        Self {
            id: record.id,
            notification_id: record.notification_id.map(|id| id.as_str().to_string()),
            event_kind: record.event_kind,
            event_subtype: record.event_subtype,
            processing_status: record.processing_status,
            error_message: record.error_message,
            received_at: record.received_at,
        }
    }
}

/// Audit history of one subscription.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationHistoryResponse {
    pub original_transaction_id: String,
    pub records: Vec<NotificationRecordResponse>,
}
