//! Subscription lifecycle transitions.
//!
//! `apply` is the single place where a lifecycle event meets the current
//! subscription row. It is pure: the caller supplies the clock and the
//! stored state, and persists whatever `Transition` comes back.
//!
//! Delivery is at-least-once and unordered, so every rule is an idempotent
//! overlay: applying an event to its own result changes nothing.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::foundation::{OriginalTransactionId, Timestamp};

use super::{Activation, EventKind, LifecycleEvent, PlanTier, Subscription, SubscriptionStatus};

/// Time-based lifecycle parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecyclePolicy {
    /// Days of continued entitlement after a failed renewal.
    pub grace_period_days: i64,

    /// Days between cancellation and scheduled data deletion.
    pub deletion_retention_days: i64,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            grace_period_days: 30,
            deletion_retention_days: 90,
        }
    }
}

/// Result of applying an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Upsert keyed by original transaction id.
    Create(Subscription),

    /// Conditional update of an existing row.
    Update(Subscription),

    /// Acknowledged without writing.
    Unchanged { reason: NoOp },
}

impl Transition {
    fn unchanged(reason: NoOp) -> Self {
        Transition::Unchanged { reason }
    }

    /// The subscription to persist, if any.
    pub fn subscription(&self) -> Option<&Subscription> {
        match self {
            Transition::Create(sub) | Transition::Update(sub) => Some(sub),
            Transition::Unchanged { .. } => None,
        }
    }

    /// The subscription state after this transition is persisted over `current`.
    pub fn resulting_state(&self, current: Option<&Subscription>) -> Option<Subscription> {
        match self {
            Transition::Create(sub) | Transition::Update(sub) => Some(sub.clone()),
            Transition::Unchanged { .. } => current.cloned(),
        }
    }
}

/// Why an event was acknowledged without a write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoOp {
    /// The event covers a period that ends before the stored one.
    Stale {
        event_expires_at: Timestamp,
        stored_renews_at: Timestamp,
    },

    /// The subscription is canceled and the event cannot reopen it.
    Canceled,

    /// The status graph does not allow the move.
    NotAllowed {
        from: SubscriptionStatus,
        kind: EventKind,
    },

    /// The event restates what is already stored.
    AlreadyApplied,

    /// The notification type carries no lifecycle change.
    NotLifecycle(String),
}

impl fmt::Display for NoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoOp::Stale {
                event_expires_at,
                stored_renews_at,
            } => write!(
                f,
                "stale event: expires {} before stored renewal {}",
                event_expires_at, stored_renews_at
            ),
            NoOp::Canceled => f.write_str("subscription is canceled"),
            NoOp::NotAllowed { from, kind } => {
                write!(f, "{} does not apply to a subscription in status {}", kind, from)
            }
            NoOp::AlreadyApplied => f.write_str("already applied"),
            NoOp::NotLifecycle(raw) => write!(f, "{} is not a lifecycle event", raw),
        }
    }
}

/// Reasons an event cannot be applied at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("no subscription exists for original transaction {0}")]
    Orphan(OriginalTransactionId),

    #[error("subscription event carries no owner reference")]
    MissingOwner,

    #[error("event is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("computed '{0}' is outside the representable date range")]
    OutOfRange(&'static str),

    #[error("transition would break an invariant: {0}")]
    InvariantViolated(String),
}

/// Apply `event` to the `current` row.
///
/// `plan` is the catalog entry for the event's product and is only consulted
/// on activation.
///
/// # Errors
///
/// - `Orphan` for any event other than `Subscribed` when no row exists
/// - `MissingOwner` / `MissingField` when activation data is absent
/// - `OutOfRange` when a derived date cannot be represented
pub fn apply(
    policy: &LifecyclePolicy,
    event: &LifecycleEvent,
    plan: &PlanTier,
    current: Option<&Subscription>,
    now: Timestamp,
) -> Result<Transition, LifecycleError> {
    let transition = match (&event.kind, current) {
        (EventKind::Unknown(raw), _) => Transition::unchanged(NoOp::NotLifecycle(raw.clone())),
        (EventKind::Subscribed, _) => subscribe(event, plan, current, now)?,
        (_, None) => {
            return Err(LifecycleError::Orphan(
                event.original_transaction_id.clone(),
            ))
        }
        (_, Some(existing)) if existing.status == SubscriptionStatus::Canceled => {
            recancel(policy, &event.kind, existing, now)?
        }
        (_, Some(existing)) => update(policy, event, existing, now)?,
    };

    if let Some(sub) = transition.subscription() {
        sub.check_invariants()
            .map_err(|err| LifecycleError::InvariantViolated(err.message))?;
    }

    Ok(transition)
}

fn subscribe(
    event: &LifecycleEvent,
    plan: &PlanTier,
    current: Option<&Subscription>,
    now: Timestamp,
) -> Result<Transition, LifecycleError> {
    let owner_id = event
        .owner_ref
        .clone()
        .ok_or(LifecycleError::MissingOwner)?;
    let expires_at = event
        .expires_at
        .ok_or(LifecycleError::MissingField("expires_date"))?;

    if let Some(existing) = current.filter(|sub| sub.is_entitled()) {
        if let Some(stale) = stale_against(existing, expires_at) {
            return Ok(Transition::unchanged(stale));
        }
    }

    let activation = Activation {
        original_transaction_id: event.original_transaction_id.clone(),
        owner_id,
        started_at: event.purchase_at.unwrap_or(event.signed_at),
        renews_at: expires_at,
        auto_renew: event.auto_renew.unwrap_or(true),
    };

    Ok(Transition::Create(Subscription::activate(
        activation, plan, now,
    )))
}

fn update(
    policy: &LifecyclePolicy,
    event: &LifecycleEvent,
    existing: &Subscription,
    now: Timestamp,
) -> Result<Transition, LifecycleError> {
    let mut next = existing.clone();

    let result = match &event.kind {
        EventKind::Renewed => {
            let expires_at = event
                .expires_at
                .ok_or(LifecycleError::MissingField("expires_date"))?;
            if let Some(stale) = stale_against(existing, expires_at) {
                return Ok(Transition::unchanged(stale));
            }
            next.renew(expires_at, now)
        }
        EventKind::RenewalFailed => {
            let period_end = event.expires_at.or(existing.renews_at).unwrap_or(now);
            let grace_end = period_end
                .add_days(policy.grace_period_days)
                .ok_or(LifecycleError::OutOfRange("grace_period_end_at"))?;
            next.enter_grace(grace_end, now)
        }
        EventKind::Expired => next.expire(now),
        EventKind::RenewalStatusChanged => {
            return Ok(match event.auto_renew {
                Some(auto_renew) if next.set_auto_renew(auto_renew, now) => {
                    Transition::Update(next)
                }
                _ => Transition::unchanged(NoOp::AlreadyApplied),
            });
        }
        kind => match cancellation_terms(policy, kind, now)? {
            Some((canceled_at, deletion_at)) => next.cancel(canceled_at, deletion_at, now),
            None => return Ok(Transition::unchanged(NoOp::NotLifecycle(kind.to_string()))),
        },
    };

    Ok(match result {
        Ok(()) => Transition::Update(next),
        Err(_) => Transition::unchanged(NoOp::NotAllowed {
            from: existing.status,
            kind: event.kind.clone(),
        }),
    })
}

/// A canceled row only accepts a further cancellation that brings deletion
/// earlier or records a missing cancellation time.
fn recancel(
    policy: &LifecyclePolicy,
    kind: &EventKind,
    existing: &Subscription,
    now: Timestamp,
) -> Result<Transition, LifecycleError> {
    let Some((canceled_at, deletion_at)) = cancellation_terms(policy, kind, now)? else {
        return Ok(Transition::unchanged(NoOp::Canceled));
    };

    let mut next = existing.clone();
    Ok(if next.tighten_cancellation(canceled_at, deletion_at, now) {
        Transition::Update(next)
    } else {
        Transition::unchanged(NoOp::AlreadyApplied)
    })
}

/// `(canceled_at, deletion_scheduled_at)` for cancellation-family events.
fn cancellation_terms(
    policy: &LifecyclePolicy,
    kind: &EventKind,
    now: Timestamp,
) -> Result<Option<(Option<Timestamp>, Timestamp)>, LifecycleError> {
    if !kind.is_cancellation() {
        return Ok(None);
    }

    let retained = || {
        now.add_days(policy.deletion_retention_days)
            .ok_or(LifecycleError::OutOfRange("deletion_scheduled_at"))
    };
    Ok(Some(match kind {
        EventKind::GracePeriodExpired => (None, retained()?),
        EventKind::Refunded => (Some(now), retained()?),
        _ => (Some(now), now),
    }))
}

fn stale_against(existing: &Subscription, expires_at: Timestamp) -> Option<NoOp> {
    existing
        .renews_at
        .filter(|stored| expires_at.is_before(stored))
        .map(|stored_renews_at| NoOp::Stale {
            event_expires_at: expires_at,
            stored_renews_at,
        })
}
