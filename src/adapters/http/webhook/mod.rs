//! HTTP adapter for billing notifications.
//!
//! - `POST /webhook` - Process a signed lifecycle notification
//! - `GET /health` - Processing health report
//! - `GET /notifications/:original_transaction_id` - Audit history

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{WebhookAppState};
pub use routes::webhook_router;
