//! In-memory adapters.
//!
//! `InMemoryPlanCatalog` is the production catalog, filled from PostgreSQL
//! at startup. The subscription repository and notification log back tests
//! and local runs without a database.

mod notification_log;
mod plan_catalog;
mod subscription_repository;

pub use notification_log::InMemoryNotificationLog;
pub use plan_catalog::InMemoryPlanCatalog;
pub use subscription_repository::InMemorySubscriptionRepository;
