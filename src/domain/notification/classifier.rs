//! Notification classification.
//!
//! Turns a verified notification into a lifecycle event: maps the upstream
//! type to an `EventKind`, verifies the nested transaction and renewal
//! payloads, and resolves the product against the plan catalog.

use std::sync::Arc;

use crate::domain::foundation::{NotificationId, OriginalTransactionId, OwnerId, Timestamp};
use crate::domain::subscription::{EventKind, LifecycleEvent, PlanTier};
use crate::ports::PlanCatalog;

use super::{SignedPayloadVerifier, VerifiedNotification, WebhookError};

/// What a verified notification means for the subscription lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// A lifecycle event for a product the catalog knows.
    Actionable { event: LifecycleEvent, plan: PlanTier },

    /// A notification type this service does not act on.
    Unknown { notification_type: String },

    /// A lifecycle event for a product missing from the catalog.
    Unresolvable {
        event: LifecycleEvent,
        product_id: String,
    },
}

/// Classifies verified notifications.
pub struct NotificationClassifier {
    verifier: Arc<SignedPayloadVerifier>,
    catalog: Arc<dyn PlanCatalog>,
}

impl NotificationClassifier {
    pub fn new(verifier: Arc<SignedPayloadVerifier>, catalog: Arc<dyn PlanCatalog>) -> Self {
        Self { verifier, catalog }
    }

    /// Classify a verified notification.
    ///
    /// # Errors
    ///
    /// - `Authentication` if a nested payload fails verification
    /// - `Decode` if a recognized notification lacks its transaction or
    ///   carries unusable identifiers or dates
    pub fn classify(
        &self,
        notification: &VerifiedNotification,
    ) -> Result<Classification, WebhookError> {
        let kind = EventKind::from_notification_type(notification.notification_type());
        if !kind.is_known() {
            return Ok(Classification::Unknown {
                notification_type: notification.notification_type().to_string(),
            });
        }

        let signed_transaction = notification.signed_transaction_info().ok_or_else(|| {
            WebhookError::Decode(format!(
                "{} notification has no signedTransactionInfo",
                kind
            ))
        })?;
        let transaction = self.verifier.verify_transaction(signed_transaction)?;

        let renewal = notification
            .signed_renewal_info()
            .map(|token| self.verifier.verify_renewal(token))
            .transpose()?;
        if let Some(renewal) = &renewal {
            if renewal.original_transaction_id != transaction.original_transaction_id {
                return Err(WebhookError::Decode(format!(
                    "renewal info belongs to {}, transaction to {}",
                    renewal.original_transaction_id, transaction.original_transaction_id
                )));
            }
        }

        let auto_renew = subtype_auto_renew(notification.subtype())
            .or_else(|| renewal.as_ref().and_then(|info| info.auto_renew()));

        let event = LifecycleEvent {
            kind,
            subtype: notification.subtype().map(str::to_string),
            notification_id: NotificationId::new(notification.notification_uuid())
                .map_err(|err| WebhookError::Decode(err.to_string()))?,
            original_transaction_id: OriginalTransactionId::new(
                transaction.original_transaction_id,
            )
            .map_err(|err| WebhookError::Decode(err.to_string()))?,
            product_id: transaction.product_id,
            expires_at: millis(transaction.expires_date, "expiresDate")?,
            purchase_at: millis(transaction.purchase_date, "purchaseDate")?,
            auto_renew,
            owner_ref: transaction
                .app_account_token
                .and_then(|token| OwnerId::new(token).ok()),
            signed_at: Timestamp::from_unix_millis(notification.signed_date())
                .ok_or_else(|| WebhookError::Decode("signedDate is out of range".to_string()))?,
        };

        Ok(match self.catalog.resolve(&event.product_id) {
            Ok(plan) => Classification::Actionable { event, plan },
            Err(unresolved) => Classification::Unresolvable {
                event,
                product_id: unresolved.product_id,
            },
        })
    }
}

fn subtype_auto_renew(subtype: Option<&str>) -> Option<bool> {
    match subtype {
        Some("AUTO_RENEW_ENABLED") => Some(true),
        Some("AUTO_RENEW_DISABLED") => Some(false),
        _ => None,
    }
}

fn millis(value: Option<i64>, field: &str) -> Result<Option<Timestamp>, WebhookError> {
    value
        .map(|millis| {
            Timestamp::from_unix_millis(millis)
                .ok_or_else(|| WebhookError::Decode(format!("{} is out of range", field)))
        })
        .transpose()
}
