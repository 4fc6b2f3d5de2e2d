//! Subscription status state machine.
//!
//! Defines the subscription lifecycle states and the transitions lifecycle
//! events may perform. `Canceled` is terminal for this subsystem; reaping of
//! canceled subscriptions happens elsewhere.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{StateMachine, ValidationError};

/// Subscription lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// No subscription has been activated yet.
    None,

    /// Paid and entitled.
    Active,

    /// Renewal failed; entitlement continues until the grace period ends.
    InGrace,

    /// Subscription period ended without renewal.
    Expired,

    /// Canceled by grace expiry, refund or revocation. Deletion is scheduled.
    Canceled,
}

impl SubscriptionStatus {
    /// Returns true if this status grants the plan's entitlements.
    pub fn is_entitled(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::InGrace)
    }

    /// Storage representation, matching the `subscriptions.status` check constraint.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::None => "none",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::InGrace => "in_grace",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(SubscriptionStatus::None),
            "active" => Ok(SubscriptionStatus::Active),
            "in_grace" => Ok(SubscriptionStatus::InGrace),
            "expired" => Ok(SubscriptionStatus::Expired),
            "canceled" => Ok(SubscriptionStatus::Canceled),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown subscription status '{}'", other),
            )),
        }
    }
}

impl StateMachine for SubscriptionStatus {
    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            None => vec![Active],
            Active => vec![Active, InGrace, Expired, Canceled],
            InGrace => vec![Active, InGrace, Expired, Canceled],
            // Billing recovery renews an expired subscription
            Expired => vec![Active, Expired, Canceled],
            Canceled => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [SubscriptionStatus; 5] = [
        SubscriptionStatus::None,
        SubscriptionStatus::Active,
        SubscriptionStatus::InGrace,
        SubscriptionStatus::Expired,
        SubscriptionStatus::Canceled,
    ];

    // ══════════════════════════════════════════════════════════════
    // Transition Graph
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn none_can_only_activate() {
        assert_eq!(
            SubscriptionStatus::None.valid_transitions(),
            vec![SubscriptionStatus::Active]
        );
    }

    #[test]
    fn active_can_renew_in_place() {
        let result = SubscriptionStatus::Active.transition_to(SubscriptionStatus::Active);
        assert_eq!(result.unwrap(), SubscriptionStatus::Active);
    }

    #[test]
    fn active_can_enter_grace() {
        assert!(SubscriptionStatus::Active.can_transition_to(&SubscriptionStatus::InGrace));
    }

    #[test]
    fn in_grace_can_recover_to_active() {
        assert!(SubscriptionStatus::InGrace.can_transition_to(&SubscriptionStatus::Active));
    }

    #[test]
    fn in_grace_can_be_canceled() {
        assert!(SubscriptionStatus::InGrace.can_transition_to(&SubscriptionStatus::Canceled));
    }

    #[test]
    fn expired_cannot_fall_back_into_grace() {
        let result = SubscriptionStatus::Expired.transition_to(SubscriptionStatus::InGrace);
        assert!(result.is_err());
    }

    #[test]
    fn expired_can_recover_through_renewal() {
        assert!(SubscriptionStatus::Expired.can_transition_to(&SubscriptionStatus::Active));
    }

    #[test]
    fn canceled_is_terminal() {
        assert!(SubscriptionStatus::Canceled.is_terminal());
        for target in ALL {
            assert!(!SubscriptionStatus::Canceled.can_transition_to(&target));
        }
    }

    #[test]
    fn only_canceled_is_terminal() {
        for status in ALL {
            assert_eq!(status.is_terminal(), status == SubscriptionStatus::Canceled);
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Entitlement
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn active_and_in_grace_are_entitled() {
        assert!(SubscriptionStatus::Active.is_entitled());
        assert!(SubscriptionStatus::InGrace.is_entitled());
    }

    #[test]
    fn expired_canceled_and_none_are_not_entitled() {
        assert!(!SubscriptionStatus::None.is_entitled());
        assert!(!SubscriptionStatus::Expired.is_entitled());
        assert!(!SubscriptionStatus::Canceled.is_entitled());
    }

    // ══════════════════════════════════════════════════════════════
    // Representation
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn storage_string_round_trips() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<SubscriptionStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_storage_string_is_rejected() {
        assert!("past_due".parse::<SubscriptionStatus>().is_err());
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&SubscriptionStatus::InGrace).unwrap();
        assert_eq!(json, "\"in_grace\"");
    }
}
