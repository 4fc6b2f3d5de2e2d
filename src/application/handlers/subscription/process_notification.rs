//! ProcessNotificationHandler - Command handler for signed lifecycle notifications.
//!
//! Pipeline: verify the outer JWS, classify (which verifies the nested
//! transaction), apply the lifecycle transition under the repository's
//! per-key lock, then append exactly one audit record for the attempt.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::foundation::{OriginalTransactionId, Timestamp};
use crate::domain::notification::{
    Classification, IdentityFragments, NotificationClassifier, NotificationRecord,
    SignedPayloadVerifier, UnverifiedEnvelope, WebhookError,
};
use crate::domain::subscription::{
    lifecycle, LifecycleError, LifecycleEvent, LifecyclePolicy, NoOp, PlanTier, Subscription,
    SubscriptionStatus, Transition,
};
use crate::ports::{NotificationLog, PlanCatalog, SubscriptionRepository, TransitionError};

/// Command to process one delivery.
#[derive(Debug, Clone)]
pub struct ProcessNotificationCommand {
    /// Compact JWS extracted from the request.
    pub signed_payload: String,

    /// Request body as received, kept verbatim in the audit record.
    pub raw_body: String,
}

impl ProcessNotificationCommand {
    /// Command for a body that is the JWS itself.
    pub fn from_token(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            signed_payload: token.clone(),
            raw_body: token,
        }
    }
}

/// Acknowledged outcome of a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessNotificationResult {
    /// A subscription row was created or updated.
    Applied {
        original_transaction_id: OriginalTransactionId,
        status: SubscriptionStatus,
    },

    /// The event was valid but changed nothing.
    Unchanged {
        original_transaction_id: OriginalTransactionId,
        reason: NoOp,
    },

    /// Notification type without lifecycle meaning.
    Ignored { notification_type: String },
}

impl ProcessNotificationResult {
    /// Note stored on the success record.
    pub fn note(&self) -> Option<String> {
        match self {
            ProcessNotificationResult::Applied { .. } => None,
            ProcessNotificationResult::Unchanged { reason, .. } => Some(reason.to_string()),
            ProcessNotificationResult::Ignored { notification_type } => {
                Some(NoOp::NotLifecycle(notification_type.clone()).to_string())
            }
        }
    }
}

/// Who a delivery attempt is attributed to in the audit log.
#[derive(Debug, Default)]
struct Attribution {
    identity: IdentityFragments,

    /// The outer envelope passed verification, so its identity is trusted
    /// and any later failure is audited.
    authenticated: bool,
}

/// Handler for inbound billing notifications.
pub struct ProcessNotificationHandler {
    verifier: Arc<SignedPayloadVerifier>,
    classifier: NotificationClassifier,
    repository: Arc<dyn SubscriptionRepository>,
    log: Arc<dyn NotificationLog>,
    policy: LifecyclePolicy,
    write_timeout: Duration,
}

impl ProcessNotificationHandler {
    pub fn new(
        verifier: Arc<SignedPayloadVerifier>,
        catalog: Arc<dyn PlanCatalog>,
        repository: Arc<dyn SubscriptionRepository>,
        log: Arc<dyn NotificationLog>,
        policy: LifecyclePolicy,
        write_timeout: Duration,
    ) -> Self {
        Self {
            classifier: NotificationClassifier::new(verifier.clone(), catalog),
            verifier,
            repository,
            log,
            policy,
            write_timeout,
        }
    }

    /// Process one delivery and record the attempt.
    ///
    /// The audit append never changes the returned outcome.
    pub async fn handle(
        &self,
        cmd: ProcessNotificationCommand,
    ) -> Result<ProcessNotificationResult, WebhookError> {
        let received_at = Timestamp::now();
        let mut attribution = Attribution::default();

        let outcome = self.process(&cmd.signed_payload, &mut attribution).await;
        self.audit(&attribution, cmd.raw_body, &outcome, received_at).await;

        outcome
    }

    async fn process(
        &self,
        signed_payload: &str,
        attribution: &mut Attribution,
    ) -> Result<ProcessNotificationResult, WebhookError> {
        let envelope = UnverifiedEnvelope::parse(signed_payload).map_err(|err| {
            attribution.identity = IdentityFragments::salvage(signed_payload);
            err
        })?;
        attribution.identity = envelope.identity_fragments();

        let notification = self.verifier.verify_notification(&envelope)?;
        attribution.identity = IdentityFragments::from_verified(&notification);
        attribution.authenticated = true;

        match self.classifier.classify(&notification)? {
            Classification::Unknown { notification_type } => {
                tracing::info!(
                    notification_id = ?attribution.identity.notification_id,
                    kind = %notification_type,
                    "Ignoring notification type without lifecycle meaning"
                );
                Ok(ProcessNotificationResult::Ignored { notification_type })
            }
            Classification::Unresolvable { event, product_id } => {
                attribution.identity = IdentityFragments::from_event(&event);
                tracing::warn!(
                    notification_id = %event.notification_id,
                    original_transaction_id = %event.original_transaction_id,
                    kind = %event.kind,
                    product_id = %product_id,
                    "Product is not in the plan catalog"
                );
                Err(WebhookError::Unresolvable(format!(
                    "product {} is not in the plan catalog",
                    product_id
                )))
            }
            Classification::Actionable { event, plan } => {
                attribution.identity = IdentityFragments::from_event(&event);
                self.apply(&event, &plan).await
            }
        }
    }

    async fn apply(
        &self,
        event: &LifecycleEvent,
        plan: &PlanTier,
    ) -> Result<ProcessNotificationResult, WebhookError> {
        let now = Timestamp::now();
        let policy = self.policy;
        let compute = |current: Option<&Subscription>| {
            lifecycle::apply(&policy, event, plan, current, now)
        };

        let write = self
            .repository
            .transition(&event.original_transaction_id, &compute);
        let transition = tokio::time::timeout(self.write_timeout, write)
            .await
            .map_err(|_| {
                WebhookError::Persistence(format!(
                    "subscription write exceeded {}ms",
                    self.write_timeout.as_millis()
                ))
            })?
            .map_err(transition_error)?;

        let original_transaction_id = event.original_transaction_id.clone();
        match transition {
            Transition::Create(sub) | Transition::Update(sub) => {
                tracing::info!(
                    notification_id = %event.notification_id,
                    original_transaction_id = %original_transaction_id,
                    kind = %event.kind,
                    status = %sub.status,
                    "Subscription transition applied"
                );
                Ok(ProcessNotificationResult::Applied {
                    original_transaction_id,
                    status: sub.status,
                })
            }
            Transition::Unchanged { reason } => {
                if matches!(reason, NoOp::Stale { .. }) {
                    tracing::warn!(
                        notification_id = %event.notification_id,
                        original_transaction_id = %original_transaction_id,
                        kind = %event.kind,
                        reason = %reason,
                        "Ignoring stale event"
                    );
                } else {
                    tracing::info!(
                        notification_id = %event.notification_id,
                        original_transaction_id = %original_transaction_id,
                        kind = %event.kind,
                        reason = %reason,
                        "Event acknowledged without change"
                    );
                }
                Ok(ProcessNotificationResult::Unchanged {
                    original_transaction_id,
                    reason,
                })
            }
        }
    }

    async fn audit(
        &self,
        attribution: &Attribution,
        raw_body: String,
        outcome: &Result<ProcessNotificationResult, WebhookError>,
        received_at: Timestamp,
    ) {
        let identity = &attribution.identity;
        let record = match outcome {
            Ok(result) => NotificationRecord::success(identity, raw_body, result.note(), received_at),
            Err(err) if err.is_audited() || attribution.authenticated => {
                NotificationRecord::failed(identity, raw_body, err.to_string(), received_at)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Dropping inauthentic notification");
                return;
            }
        };

        if !identity.has_identity() {
            tracing::warn!(
                status = %record.processing_status,
                error = ?record.error_message,
                "No identity recovered from notification, not audited"
            );
            return;
        }

        match tokio::time::timeout(self.write_timeout, self.log.append(&record)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(
                notification_id = ?identity.notification_id,
                original_transaction_id = ?identity.original_transaction_id,
                "Failed to append notification record: {}",
                e
            ),
            Err(_) => tracing::error!(
                notification_id = ?identity.notification_id,
                original_transaction_id = ?identity.original_transaction_id,
                "Notification record append exceeded {}ms",
                self.write_timeout.as_millis()
            ),
        }
    }
}

fn transition_error(err: TransitionError) -> WebhookError {
    match err {
        TransitionError::Lifecycle(LifecycleError::Orphan(id)) => WebhookError::Orphan(id),
        TransitionError::Lifecycle(
            err @ (LifecycleError::MissingOwner
            | LifecycleError::MissingField(_)
            | LifecycleError::OutOfRange(_)),
        ) => WebhookError::Decode(err.to_string()),
        TransitionError::Lifecycle(err @ LifecycleError::InvariantViolated(_)) => {
            WebhookError::Persistence(err.to_string())
        }
        TransitionError::Storage(err) => WebhookError::Persistence(err.to_string()),
    }
}
