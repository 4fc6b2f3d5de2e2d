//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresSubscriptionRepository` - Row-locked lifecycle transitions
//! - `PostgresNotificationLog` - Append-only audit trail
//! - `load_plan_catalog` - Startup load of the plan tier reference table

mod notification_log;
mod plan_tiers;
mod subscription_repository;

pub use notification_log::PostgresNotificationLog;
pub use plan_tiers::load_plan_catalog;
pub use subscription_repository::PostgresSubscriptionRepository;
