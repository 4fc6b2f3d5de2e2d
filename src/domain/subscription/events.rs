//! Lifecycle events.
//!
//! A `LifecycleEvent` is the classified, verified form of one billing
//! notification: the kind of change plus the transaction fields the state
//! machine needs to apply it.
//!
//! # Event Naming Convention
//!
//! Kinds are named in past tense, mirroring the upstream notification types:
//! `DID_RENEW` becomes `Renewed`, `DID_FAIL_TO_RENEW` becomes `RenewalFailed`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{NotificationId, OriginalTransactionId, OwnerId, Timestamp};

/// Kind of lifecycle change a notification announces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// `SUBSCRIBED` - initial purchase or resubscribe.
    Subscribed,

    /// `DID_RENEW` - a renewal billed successfully.
    Renewed,

    /// `DID_FAIL_TO_RENEW` - billing failed; entitlement enters the grace period.
    RenewalFailed,

    /// `EXPIRED` - the period ended without renewal.
    Expired,

    /// `GRACE_PERIOD_EXPIRED` - billing never recovered during grace.
    GracePeriodExpired,

    /// `DID_CHANGE_RENEWAL_STATUS` - the subscriber toggled auto-renew.
    RenewalStatusChanged,

    /// `REFUND` - the purchase was refunded.
    Refunded,

    /// `REVOKE` - entitlement was revoked, e.g. family sharing removed.
    Revoked,

    /// Any notification type this service does not act on.
    Unknown(String),
}

impl EventKind {
    /// Maps an upstream notification type to an event kind.
    pub fn from_notification_type(notification_type: &str) -> Self {
        match notification_type {
            "SUBSCRIBED" => EventKind::Subscribed,
            "DID_RENEW" => EventKind::Renewed,
            "DID_FAIL_TO_RENEW" => EventKind::RenewalFailed,
            "EXPIRED" => EventKind::Expired,
            "GRACE_PERIOD_EXPIRED" => EventKind::GracePeriodExpired,
            "DID_CHANGE_RENEWAL_STATUS" => EventKind::RenewalStatusChanged,
            "REFUND" => EventKind::Refunded,
            "REVOKE" => EventKind::Revoked,
            other => EventKind::Unknown(other.to_string()),
        }
    }

    /// Returns the upstream notification type string.
    pub fn notification_type(&self) -> &str {
        match self {
            EventKind::Subscribed => "SUBSCRIBED",
            EventKind::Renewed => "DID_RENEW",
            EventKind::RenewalFailed => "DID_FAIL_TO_RENEW",
            EventKind::Expired => "EXPIRED",
            EventKind::GracePeriodExpired => "GRACE_PERIOD_EXPIRED",
            EventKind::RenewalStatusChanged => "DID_CHANGE_RENEWAL_STATUS",
            EventKind::Refunded => "REFUND",
            EventKind::Revoked => "REVOKE",
            EventKind::Unknown(raw) => raw,
        }
    }

    /// Returns true for kinds that end in cancellation.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            EventKind::GracePeriodExpired | EventKind::Refunded | EventKind::Revoked
        )
    }

    /// Returns true for kinds the state machine acts on.
    pub fn is_known(&self) -> bool {
        !matches!(self, EventKind::Unknown(_))
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.notification_type())
    }
}

/// A verified lifecycle change for one subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub kind: EventKind,

    /// Upstream subtype, e.g. `AUTO_RENEW_DISABLED` or `GRACE_PERIOD`.
    pub subtype: Option<String>,

    pub notification_id: NotificationId,

    pub original_transaction_id: OriginalTransactionId,

    pub product_id: String,

    /// End of the period the transaction pays for.
    pub expires_at: Option<Timestamp>,

    pub purchase_at: Option<Timestamp>,

    /// Auto-renew preference, when the notification states one.
    pub auto_renew: Option<bool>,

    /// Subscriber reference from the transaction's account token.
    pub owner_ref: Option<OwnerId>,

    /// When the billing system signed the notification.
    pub signed_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWN: [&str; 8] = [
        "SUBSCRIBED",
        "DID_RENEW",
        "DID_FAIL_TO_RENEW",
        "EXPIRED",
        "GRACE_PERIOD_EXPIRED",
        "DID_CHANGE_RENEWAL_STATUS",
        "REFUND",
        "REVOKE",
    ];

    #[test]
    fn known_types_map_back_to_their_upstream_name() {
        for raw in KNOWN {
            let kind = EventKind::from_notification_type(raw);
            assert!(kind.is_known(), "{} should be known", raw);
            assert_eq!(kind.notification_type(), raw);
        }
    }

    #[test]
    fn unrecognized_type_is_unknown_and_keeps_raw_value() {
        let kind = EventKind::from_notification_type("NEW_TYPE_FROM_VENDOR");
        assert_eq!(kind, EventKind::Unknown("NEW_TYPE_FROM_VENDOR".to_string()));
        assert_eq!(kind.to_string(), "NEW_TYPE_FROM_VENDOR");
        assert!(!kind.is_known());
    }

    #[test]
    fn mapping_is_case_sensitive() {
        assert!(!EventKind::from_notification_type("did_renew").is_known());
    }

    #[test]
    fn cancellation_family() {
        assert!(EventKind::GracePeriodExpired.is_cancellation());
        assert!(EventKind::Refunded.is_cancellation());
        assert!(EventKind::Revoked.is_cancellation());
        assert!(!EventKind::Expired.is_cancellation());
        assert!(!EventKind::RenewalFailed.is_cancellation());
    }
}
