//! Notification domain module.
//!
//! Authenticates signed billing notifications, classifies them into
//! lifecycle events and describes how each attempt is audited.
//!
//! # Module Structure
//!
//! - `envelope` - Unverified JWS envelopes and payload models
//! - `verifier` - Certificate chain and signature verification
//! - `classifier` - Verified notification to lifecycle event
//! - `errors` - WebhookError taxonomy
//! - `audit` - NotificationRecord
//! - `health` - Processing health report

mod audit;
mod classifier;
mod envelope;
mod errors;
mod health;
mod verifier;

#[cfg(test)]
pub(crate) mod fixtures;

pub use audit::{NotificationRecord, ProcessingStatus, UNDECODABLE};
pub use classifier::{Classification, NotificationClassifier};
pub use envelope::{
    IdentityFragments, NotificationData, NotificationPayload, RenewalInfo, TransactionInfo,
    UnverifiedEnvelope,
};
pub use errors::{AuthFailure, WebhookError};
pub use health::{HealthReport, HealthStatus, ProcessingSummary};
pub use verifier::{
    Environment, SignedPayloadVerifier, TrustStore, TrustStoreError, VerifiedNotification,
};
