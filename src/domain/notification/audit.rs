//! Audit records of notification processing.
//!
//! Every processing attempt that can be attributed to a notification or a
//! subscription produces exactly one immutable `NotificationRecord`, whether
//! it succeeded or not.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::foundation::{NotificationId, OriginalTransactionId, Timestamp, ValidationError};
use crate::domain::subscription::LifecycleEvent;

use super::{IdentityFragments, VerifiedNotification};

/// `event_kind` recorded when not even the notification type was readable.
pub const UNDECODABLE: &str = "UNDECODABLE";

/// Outcome of one processing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Success,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Success => "success",
            ProcessingStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(ProcessingStatus::Success),
            "failed" => Ok(ProcessingStatus::Failed),
            other => Err(ValidationError::invalid_format(
                "processing_status",
                format!("unknown processing status '{}'", other),
            )),
        }
    }
}

/// Immutable audit entry for one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: Uuid,

    /// External notification id. Redeliveries repeat it.
    pub notification_id: Option<NotificationId>,

    /// Upstream notification type, or `UNDECODABLE`.
    pub event_kind: String,

    pub event_subtype: Option<String>,

    pub original_transaction_id: Option<OriginalTransactionId>,

    /// The request body as received.
    pub raw_payload: String,

    pub processing_status: ProcessingStatus,

    /// Failure reason, or a note explaining a successful no-op.
    pub error_message: Option<String>,

    pub received_at: Timestamp,
}

impl NotificationRecord {
    /// Creates a success record. `note` explains acknowledged no-ops.
    pub fn success(
        identity: &IdentityFragments,
        raw_payload: impl Into<String>,
        note: Option<String>,
        received_at: Timestamp,
    ) -> Self {
        Self::new(identity, raw_payload.into(), ProcessingStatus::Success, note, received_at)
    }

    /// Creates a failure record.
    pub fn failed(
        identity: &IdentityFragments,
        raw_payload: impl Into<String>,
        error: impl Into<String>,
        received_at: Timestamp,
    ) -> Self {
        Self::new(
            identity,
            raw_payload.into(),
            ProcessingStatus::Failed,
            Some(error.into()),
            received_at,
        )
    }

    fn new(
        identity: &IdentityFragments,
        raw_payload: String,
        processing_status: ProcessingStatus,
        error_message: Option<String>,
        received_at: Timestamp,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            notification_id: identity.notification_id.clone(),
            event_kind: identity
                .notification_type
                .clone()
                .unwrap_or_else(|| UNDECODABLE.to_string()),
            event_subtype: identity.subtype.clone(),
            original_transaction_id: identity.original_transaction_id.clone(),
            raw_payload,
            processing_status,
            error_message,
            received_at,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.processing_status == ProcessingStatus::Failed
    }
}

impl IdentityFragments {
    /// Identity of a verified notification, before classification.
    pub fn from_verified(notification: &VerifiedNotification) -> Self {
        Self {
            notification_id: NotificationId::new(notification.notification_uuid()).ok(),
            notification_type: Some(notification.notification_type().to_string()),
            subtype: notification.subtype().map(str::to_string),
            original_transaction_id: None,
        }
    }

    /// Identity of a classified event.
    pub fn from_event(event: &LifecycleEvent) -> Self {
        Self {
            notification_id: Some(event.notification_id.clone()),
            notification_type: Some(event.kind.notification_type().to_string()),
            subtype: event.subtype.clone(),
            original_transaction_id: Some(event.original_transaction_id.clone()),
        }
    }

    /// Fills fields this identity lacks from `other`.
    pub fn or(self, other: IdentityFragments) -> Self {
        Self {
            notification_id: self.notification_id.or(other.notification_id),
            notification_type: self.notification_type.or(other.notification_type),
            subtype: self.subtype.or(other.subtype),
            original_transaction_id: self
                .original_transaction_id
                .or(other.original_transaction_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> IdentityFragments {
        IdentityFragments {
            notification_id: Some(NotificationId::new("n-1").unwrap()),
            notification_type: Some("DID_RENEW".to_string()),
            subtype: None,
            original_transaction_id: Some(OriginalTransactionId::new("T1").unwrap()),
        }
    }

    #[test]
    fn success_record_carries_identity_and_note() {
        let record = NotificationRecord::success(
            &identity(),
            "eyJ...",
            Some("already applied".to_string()),
            Timestamp::now(),
        );

        assert_eq!(record.processing_status, ProcessingStatus::Success);
        assert_eq!(record.event_kind, "DID_RENEW");
        assert_eq!(record.error_message.as_deref(), Some("already applied"));
        assert_eq!(
            record.original_transaction_id.as_ref().map(|id| id.as_str()),
            Some("T1")
        );
        assert!(!record.is_failure());
    }

    #[test]
    fn failed_record_without_type_is_undecodable() {
        let fragments = IdentityFragments {
            notification_id: Some(NotificationId::new("n-2").unwrap()),
            ..IdentityFragments::default()
        };
        let record = NotificationRecord::failed(&fragments, "garbage", "Decode error: bad", Timestamp::now());

        assert_eq!(record.event_kind, UNDECODABLE);
        assert!(record.is_failure());
        assert_eq!(record.error_message.as_deref(), Some("Decode error: bad"));
    }

    #[test]
    fn each_record_gets_its_own_id() {
        let a = NotificationRecord::success(&identity(), "p", None, Timestamp::now());
        let b = NotificationRecord::success(&identity(), "p", None, Timestamp::now());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn or_prefers_own_fields() {
        let partial = IdentityFragments {
            notification_type: Some("REFUND".to_string()),
            ..IdentityFragments::default()
        };
        let merged = partial.or(identity());

        assert_eq!(merged.notification_type.as_deref(), Some("REFUND"));
        assert!(merged.notification_id.is_some());
        assert!(merged.original_transaction_id.is_some());
    }

    #[test]
    fn processing_status_round_trips_storage_value() {
        assert_eq!("failed".parse::<ProcessingStatus>().unwrap(), ProcessingStatus::Failed);
        assert_eq!(ProcessingStatus::Success.as_str(), "success");
        assert!("ignored".parse::<ProcessingStatus>().is_err());
    }
}
