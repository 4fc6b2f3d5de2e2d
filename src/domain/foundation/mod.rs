//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, the state machine trait and error
//! types shared by the subscription and notification domains.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{NotificationId, OriginalTransactionId, OwnerId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
