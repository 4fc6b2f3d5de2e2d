//! In-memory implementation of NotificationLog.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, OriginalTransactionId, Timestamp};
use crate::domain::notification::{NotificationRecord, ProcessingSummary};
use crate::ports::NotificationLog;

/// Append-only log kept in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryNotificationLog {
    records: RwLock<Vec<NotificationRecord>>,
}

impl InMemoryNotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record appended so far.
    pub async fn records(&self) -> Vec<NotificationRecord> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl NotificationLog for InMemoryNotificationLog {
    async fn append(&self, record: &NotificationRecord) -> Result<(), DomainError> {
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn summarize_since(&self, since: Timestamp) -> Result<ProcessingSummary, DomainError> {
        let records = self.records.read().await;
        let window = records.iter().filter(|r| !r.received_at.is_before(&since));

        let mut summary = ProcessingSummary::default();
        for record in window {
            summary.total += 1;
            if record.is_failure() {
                summary.failed += 1;
            }
            summary.last_received_at = summary.last_received_at.max(Some(record.received_at));
        }
        Ok(summary)
    }

    async fn history(
        &self,
        id: &OriginalTransactionId,
    ) -> Result<Vec<NotificationRecord>, DomainError> {
        let records = self.records.read().await;
        let mut history: Vec<_> = records
            .iter()
            .filter(|r| r.original_transaction_id.as_ref() == Some(id))
            .cloned()
            .collect();
        history.sort_by_key(|r| r.received_at);
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::NotificationId;
    use crate::domain::notification::IdentityFragments;

    fn identity(otid: Option<&str>) -> IdentityFragments {
        IdentityFragments {
            notification_id: Some(NotificationId::new("n-1").unwrap()),
            notification_type: Some("DID_RENEW".to_string()),
            subtype: None,
            original_transaction_id: otid.map(|id| OriginalTransactionId::new(id).unwrap()),
        }
    }

    #[tokio::test]
    async fn append_keeps_redeliveries() {
        let log = InMemoryNotificationLog::new();
        let now = Timestamp::now();

        log.append(&NotificationRecord::success(&identity(Some("T1")), "p", None, now))
            .await
            .unwrap();
        log.append(&NotificationRecord::success(&identity(Some("T1")), "p", None, now))
            .await
            .unwrap();

        assert_eq!(log.len().await, 2);
    }

    #[tokio::test]
    async fn summary_counts_window_only() {
        let log = InMemoryNotificationLog::new();
        let now = Timestamp::now();

        log.append(&NotificationRecord::success(&identity(None), "p", None, now.minus_hours(48)))
            .await
            .unwrap();
        log.append(&NotificationRecord::success(&identity(None), "p", None, now.minus_hours(2)))
            .await
            .unwrap();
        log.append(&NotificationRecord::failed(&identity(None), "p", "boom", now.minus_hours(1)))
            .await
            .unwrap();

        let summary = log.summarize_since(now.minus_hours(24)).await.unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.last_received_at, Some(now.minus_hours(1)));
    }

    #[tokio::test]
    async fn empty_summary_has_no_last_record() {
        let log = InMemoryNotificationLog::new();
        let summary = log.summarize_since(Timestamp::now()).await.unwrap();
        assert_eq!(summary, ProcessingSummary::default());
    }

    #[tokio::test]
    async fn history_filters_by_subscription_oldest_first() {
        let log = InMemoryNotificationLog::new();
        let now = Timestamp::now();

        log.append(&NotificationRecord::success(&identity(Some("T1")), "second", None, now))
            .await
            .unwrap();
        log.append(&NotificationRecord::success(&identity(Some("T2")), "other", None, now))
            .await
            .unwrap();
        log.append(&NotificationRecord::success(
            &identity(Some("T1")),
            "first",
            None,
            now.minus_hours(3),
        ))
        .await
        .unwrap();

        let history = log
            .history(&OriginalTransactionId::new("T1").unwrap())
            .await
            .unwrap();

        let payloads: Vec<_> = history.iter().map(|r| r.raw_payload.as_str()).collect();
        assert_eq!(payloads, vec!["first", "second"]);
    }
}
