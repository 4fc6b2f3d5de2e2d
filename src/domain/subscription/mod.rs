//! Subscription domain module.
//!
//! Handles the subscription lifecycle driven by billing notifications.
//!
//! # Module Structure
//!
//! - `aggregate` - Subscription aggregate entity
//! - `events` - Lifecycle events and their upstream kinds
//! - `lifecycle` - Pure event application
//! - `plan` - Plan keys and catalog entries
//! - `status` - SubscriptionStatus state machine

mod aggregate;
mod events;
pub mod lifecycle;
mod plan;
mod status;

pub use aggregate::{Activation, Subscription};
pub use events::{EventKind, LifecycleEvent};
pub use lifecycle::{LifecycleError, LifecyclePolicy, NoOp, Transition};
pub use plan::{PlanKey, PlanTier, UnresolvedProduct};
pub use status::SubscriptionStatus;
