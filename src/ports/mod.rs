//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Subscription Ports
//!
//! - `SubscriptionRepository` - Per-key serialized subscription writes
//! - `PlanCatalog` - Product to plan lookup
//!
//! ## Audit Ports
//!
//! - `NotificationLog` - Append-only processing audit trail

mod notification_log;
mod plan_catalog;
mod subscription_repository;

pub use notification_log::NotificationLog;
pub use plan_catalog::PlanCatalog;
pub use subscription_repository::{SubscriptionRepository, TransitionError, TransitionFn};
