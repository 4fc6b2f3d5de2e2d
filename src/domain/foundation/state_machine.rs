//! State machine trait for lifecycle status enums.
//!
//! Status enums declare their transition graph once; callers get validated
//! transitions and terminal-state checks from the trait.

use super::{DomainError, ErrorCode};

/// Trait for status enums that represent state machines.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for SubscriptionStatus {
///     fn valid_transitions(&self) -> Vec<Self> {
///         match self {
///             None => vec![Active],
///             Canceled => vec![],
///             // ...
///         }
///     }
/// }
///
/// let next = current.transition_to(SubscriptionStatus::InGrace)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns all valid target states from the current state.
    ///
    /// Self-loops must be listed explicitly; an idempotent redelivery that
    /// keeps the status is a transition like any other.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, DomainError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
