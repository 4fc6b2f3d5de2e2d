//! Subscription handlers.
//!
//! ## Commands
//! - Processing signed lifecycle notifications
//!
//! ## Queries
//! - Processing health over a trailing window
//! - Audit history of one subscription

mod get_notification_history;
mod get_processing_health;
mod process_notification;

// Commands
pub use process_notification::{
    ProcessNotificationCommand, ProcessNotificationHandler, ProcessNotificationResult,
};

// Queries
pub use get_notification_history::{
    GetNotificationHistoryHandler, GetNotificationHistoryQuery, GetNotificationHistoryResult,
};
pub use get_processing_health::{
    GetProcessingHealthHandler, GetProcessingHealthQuery, GetProcessingHealthResult,
    HealthSettings, MAX_WINDOW_HOURS,
};
