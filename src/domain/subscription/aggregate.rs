//! Subscription aggregate entity.
//!
//! One `Subscription` exists per original transaction id and follows that
//! lineage across renewals. Rows are created by the first `Subscribed` event
//! and never physically deleted by this service; cancellation only schedules
//! deletion.
//!
//! # Design Decisions
//!
//! - **Explicit clock**: every mutation takes `now`, so the lifecycle
//!   function stays pure and replays deterministically.
//! - **Storage in bytes**: entitlements are stored as `i64` bytes, copied
//!   from the plan at activation.

use crate::domain::foundation::{
    DomainError, ErrorCode, OriginalTransactionId, OwnerId, StateMachine, Timestamp,
};
use serde::{Deserialize, Serialize};

use super::{PlanKey, PlanTier, SubscriptionStatus};

/// Subscription aggregate.
///
/// # Invariants
///
/// - `original_transaction_id` is unique
/// - `grace_period_end_at` is set only while `status == InGrace`
/// - `deletion_scheduled_at` is set only while `status == Canceled`
/// - Status transitions follow the state machine rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub original_transaction_id: OriginalTransactionId,

    /// Subscriber who owns this subscription.
    pub owner_id: OwnerId,

    pub plan_key: PlanKey,

    pub status: SubscriptionStatus,

    /// Billing product the subscription was activated with.
    pub product_id: String,

    /// Storage entitlement in bytes.
    pub storage_quota: i64,

    pub auto_renew: bool,

    pub subscription_start_at: Timestamp,

    /// End of the currently paid period.
    pub renews_at: Option<Timestamp>,

    pub grace_period_end_at: Option<Timestamp>,

    pub canceled_at: Option<Timestamp>,

    /// When downstream cleanup may delete the subscriber's data.
    pub deletion_scheduled_at: Option<Timestamp>,

    pub updated_at: Timestamp,
}

/// Fields required to activate a subscription.
#[derive(Debug, Clone)]
pub struct Activation {
    pub original_transaction_id: OriginalTransactionId,
    pub owner_id: OwnerId,
    pub started_at: Timestamp,
    pub renews_at: Timestamp,
    pub auto_renew: bool,
}

impl Subscription {
    /// Creates an active subscription with entitlements taken from `plan`.
    pub fn activate(activation: Activation, plan: &PlanTier, now: Timestamp) -> Self {
        Self {
            original_transaction_id: activation.original_transaction_id,
            owner_id: activation.owner_id,
            plan_key: plan.plan_key,
            status: SubscriptionStatus::Active,
            product_id: plan.product_id.clone(),
            storage_quota: plan.storage_quota,
            auto_renew: activation.auto_renew,
            subscription_start_at: activation.started_at,
            renews_at: Some(activation.renews_at),
            grace_period_end_at: None,
            canceled_at: None,
            deletion_scheduled_at: None,
            updated_at: now,
        }
    }

    /// Check if this subscription currently grants its plan's entitlements.
    pub fn is_entitled(&self) -> bool {
        self.status.is_entitled()
    }

    /// Record a successful renewal through `expires_at`.
    ///
    /// # Errors
    ///
    /// Returns error if the current status cannot return to active.
    pub fn renew(&mut self, expires_at: Timestamp, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Active)?;
        self.renews_at = Some(expires_at);
        self.grace_period_end_at = None;
        self.updated_at = now;
        Ok(())
    }

    /// Enter the billing grace period, which ends at `grace_end`.
    ///
    /// # Errors
    ///
    /// Returns error if the current status cannot enter grace.
    pub fn enter_grace(&mut self, grace_end: Timestamp, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::InGrace)?;
        self.grace_period_end_at = Some(grace_end);
        self.updated_at = now;
        Ok(())
    }

    /// Mark the subscription as expired.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn expire(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Expired)?;
        self.grace_period_end_at = None;
        self.updated_at = now;
        Ok(())
    }

    /// Cancel the subscription and schedule deletion of its data.
    ///
    /// `canceled_at` is only recorded when given; grace expiry cancels
    /// without a cancellation timestamp.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn cancel(
        &mut self,
        canceled_at: Option<Timestamp>,
        deletion_at: Timestamp,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Canceled)?;
        if canceled_at.is_some() {
            self.canceled_at = canceled_at;
        }
        self.grace_period_end_at = None;
        self.deletion_scheduled_at = Some(deletion_at);
        self.updated_at = now;
        Ok(())
    }

    /// Apply a further cancellation to an already canceled subscription.
    ///
    /// Deletion may only move earlier and `canceled_at` is only filled when
    /// unset. Returns true if anything changed.
    pub fn tighten_cancellation(
        &mut self,
        canceled_at: Option<Timestamp>,
        deletion_at: Timestamp,
        now: Timestamp,
    ) -> bool {
        let mut changed = false;

        let earliest = match self.deletion_scheduled_at {
            Some(existing) if existing <= deletion_at => existing,
            _ => deletion_at,
        };
        if self.deletion_scheduled_at != Some(earliest) {
            self.deletion_scheduled_at = Some(earliest);
            changed = true;
        }

        if self.canceled_at.is_none() && canceled_at.is_some() {
            self.canceled_at = canceled_at;
            changed = true;
        }

        if changed {
            self.updated_at = now;
        }
        changed
    }

    /// Update the auto-renew preference. Returns true if it changed.
    pub fn set_auto_renew(&mut self, auto_renew: bool, now: Timestamp) -> bool {
        if self.auto_renew == auto_renew {
            return false;
        }
        self.auto_renew = auto_renew;
        self.updated_at = now;
        true
    }

    /// Verify the status-dependent field invariants.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolated` naming the first broken invariant.
    pub fn check_invariants(&self) -> Result<(), DomainError> {
        if self.grace_period_end_at.is_some() && self.status != SubscriptionStatus::InGrace {
            return Err(DomainError::new(
                ErrorCode::InvariantViolated,
                format!(
                    "grace_period_end_at is set while status is {}",
                    self.status
                ),
            )
            .with_detail("original_transaction_id", self.original_transaction_id.as_str()));
        }
        if self.deletion_scheduled_at.is_some() && self.status != SubscriptionStatus::Canceled {
            return Err(DomainError::new(
                ErrorCode::InvariantViolated,
                format!(
                    "deletion_scheduled_at is set while status is {}",
                    self.status
                ),
            )
            .with_detail("original_transaction_id", self.original_transaction_id.as_str()));
        }
        Ok(())
    }

    fn transition_to(&mut self, target: SubscriptionStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition subscription from {} to {}",
                    self.status, target
                ),
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(days: i64) -> Timestamp {
        Timestamp::from_unix_millis(1_767_225_600_000)
            .unwrap()
            .add_days(days)
            .unwrap()
    }

    fn standard_plan() -> PlanTier {
        PlanTier::new("plan.standard", PlanKey::Standard, 200 * 1024 * 1024 * 1024)
    }

    fn active_subscription() -> Subscription {
        Subscription::activate(
            Activation {
                original_transaction_id: OriginalTransactionId::new("T1").unwrap(),
                owner_id: OwnerId::new("owner-1").unwrap(),
                started_at: at(0),
                renews_at: at(30),
                auto_renew: true,
            },
            &standard_plan(),
            at(0),
        )
    }

    // ══════════════════════════════════════════════════════════════
    // Activation
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn activate_copies_plan_entitlements() {
        let sub = active_subscription();

        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.plan_key, PlanKey::Standard);
        assert_eq!(sub.product_id, "plan.standard");
        assert_eq!(sub.storage_quota, 200 * 1024 * 1024 * 1024);
        assert_eq!(sub.renews_at, Some(at(30)));
        assert!(sub.is_entitled());
        assert!(sub.check_invariants().is_ok());
    }

    // ══════════════════════════════════════════════════════════════
    // Transitions
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn renew_clears_grace_period() {
        let mut sub = active_subscription();
        sub.enter_grace(at(60), at(31)).unwrap();

        sub.renew(at(62), at(32)).unwrap();

        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.renews_at, Some(at(62)));
        assert!(sub.grace_period_end_at.is_none());
        assert_eq!(sub.updated_at, at(32));
    }

    #[test]
    fn enter_grace_sets_grace_end() {
        let mut sub = active_subscription();
        sub.enter_grace(at(60), at(30)).unwrap();

        assert_eq!(sub.status, SubscriptionStatus::InGrace);
        assert_eq!(sub.grace_period_end_at, Some(at(60)));
        assert!(sub.is_entitled());
    }

    #[test]
    fn expire_clears_grace_period() {
        let mut sub = active_subscription();
        sub.enter_grace(at(60), at(30)).unwrap();
        sub.expire(at(40)).unwrap();

        assert_eq!(sub.status, SubscriptionStatus::Expired);
        assert!(sub.grace_period_end_at.is_none());
        assert!(sub.check_invariants().is_ok());
    }

    #[test]
    fn expired_cannot_enter_grace() {
        let mut sub = active_subscription();
        sub.expire(at(30)).unwrap();

        let err = sub.enter_grace(at(60), at(31)).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
        assert_eq!(sub.status, SubscriptionStatus::Expired);
    }

    #[test]
    fn cancel_schedules_deletion() {
        let mut sub = active_subscription();
        sub.cancel(Some(at(5)), at(95), at(5)).unwrap();

        assert_eq!(sub.status, SubscriptionStatus::Canceled);
        assert_eq!(sub.canceled_at, Some(at(5)));
        assert_eq!(sub.deletion_scheduled_at, Some(at(95)));
        assert!(sub.check_invariants().is_ok());
    }

    #[test]
    fn canceled_subscription_cannot_renew() {
        let mut sub = active_subscription();
        sub.cancel(None, at(95), at(5)).unwrap();

        assert!(sub.renew(at(60), at(6)).is_err());
        assert_eq!(sub.status, SubscriptionStatus::Canceled);
    }

    // ══════════════════════════════════════════════════════════════
    // Repeated cancellation
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn tighten_cancellation_moves_deletion_earlier() {
        let mut sub = active_subscription();
        sub.cancel(Some(at(5)), at(95), at(5)).unwrap();

        assert!(sub.tighten_cancellation(Some(at(6)), at(6), at(6)));
        assert_eq!(sub.deletion_scheduled_at, Some(at(6)));
        assert_eq!(sub.canceled_at, Some(at(5)));
    }

    #[test]
    fn tighten_cancellation_never_postpones_deletion() {
        let mut sub = active_subscription();
        sub.cancel(Some(at(5)), at(5), at(5)).unwrap();

        assert!(!sub.tighten_cancellation(Some(at(6)), at(96), at(6)));
        assert_eq!(sub.deletion_scheduled_at, Some(at(5)));
        assert_eq!(sub.updated_at, at(5));
    }

    #[test]
    fn tighten_cancellation_fills_missing_canceled_at() {
        let mut sub = active_subscription();
        sub.cancel(None, at(120), at(30)).unwrap();

        assert!(sub.tighten_cancellation(Some(at(31)), at(121), at(31)));
        assert_eq!(sub.canceled_at, Some(at(31)));
        assert_eq!(sub.deletion_scheduled_at, Some(at(120)));
    }

    // ══════════════════════════════════════════════════════════════
    // Auto-renew and invariants
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn set_auto_renew_reports_change() {
        let mut sub = active_subscription();

        assert!(!sub.set_auto_renew(true, at(1)));
        assert!(sub.set_auto_renew(false, at(2)));
        assert!(!sub.auto_renew);
        assert_eq!(sub.updated_at, at(2));
    }

    #[test]
    fn check_invariants_rejects_grace_outside_in_grace() {
        let mut sub = active_subscription();
        sub.grace_period_end_at = Some(at(60));

        let err = sub.check_invariants().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvariantViolated);
    }

    #[test]
    fn check_invariants_rejects_deletion_outside_canceled() {
        let mut sub = active_subscription();
        sub.deletion_scheduled_at = Some(at(90));

        let err = sub.check_invariants().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvariantViolated);
        assert_eq!(
            err.details.get("original_transaction_id"),
            Some(&"T1".to_string())
        );
    }
}
