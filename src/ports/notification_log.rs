//! NotificationLog port - Append-only audit trail of processing attempts.
//!
//! Records are never updated or deleted. The log doubles as the source for
//! the processing health report and per-subscription forensic history.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OriginalTransactionId, Timestamp};
use crate::domain::notification::{NotificationRecord, ProcessingSummary};

/// Port for the notification audit log.
#[async_trait]
pub trait NotificationLog: Send + Sync {
    /// Append one record.
    ///
    /// Records sharing a notification id are all kept; redeliveries are
    /// separate attempts.
    async fn append(&self, record: &NotificationRecord) -> Result<(), DomainError>;

    /// Totals for records received at or after `since`.
    async fn summarize_since(&self, since: Timestamp) -> Result<ProcessingSummary, DomainError>;

    /// All records for one subscription, oldest first.
    async fn history(
        &self,
        id: &OriginalTransactionId,
    ) -> Result<Vec<NotificationRecord>, DomainError>;
}
