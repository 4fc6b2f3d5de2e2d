//! PostgreSQL implementation of NotificationLog.
//!
//! `notification_records` is insert-only; a trigger rejects UPDATE and DELETE.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, NotificationId, OriginalTransactionId, Timestamp,
};
use crate::domain::notification::{NotificationRecord, ProcessingStatus, ProcessingSummary};
use crate::ports::NotificationLog;

pub struct PostgresNotificationLog {
    pool: PgPool,
}

impl PostgresNotificationLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct NotificationRecordRow {
    id: Uuid,
    notification_id: Option<String>,
    event_kind: String,
    event_subtype: Option<String>,
    original_transaction_id: Option<String>,
    raw_payload: String,
    processing_status: String,
    error_message: Option<String>,
    received_at: DateTime<Utc>,
}

impl TryFrom<NotificationRecordRow> for NotificationRecord {
    type Error = DomainError;

    fn try_from(row: NotificationRecordRow) -> Result<Self, Self::Error> {
        let invalid = |field: &str, e: &dyn std::fmt::Display| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid {}: {}", field, e))
        };

        Ok(NotificationRecord {
            id: row.id,
            notification_id: row
                .notification_id
                .map(NotificationId::new)
                .transpose()
                .map_err(|e| invalid("notification_id", &e))?,
            event_kind: row.event_kind,
            event_subtype: row.event_subtype,
            original_transaction_id: row
                .original_transaction_id
                .map(OriginalTransactionId::new)
                .transpose()
                .map_err(|e| invalid("original_transaction_id", &e))?,
            raw_payload: row.raw_payload,
            processing_status: row
                .processing_status
                .parse::<ProcessingStatus>()
                .map_err(|e| invalid("processing_status", &e))?,
            error_message: row.error_message,
            received_at: Timestamp::from_datetime(row.received_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    total: i64,
    failed: i64,
    last_received_at: Option<DateTime<Utc>>,
}

impl From<SummaryRow> for ProcessingSummary {
    fn from(row: SummaryRow) -> Self {
        ProcessingSummary {
            total: row.total.max(0) as u64,
            failed: row.failed.max(0) as u64,
            last_received_at: row.last_received_at.map(Timestamp::from_datetime),
        }
    }
}

#[async_trait]
impl NotificationLog for PostgresNotificationLog {
    async fn append(&self, record: &NotificationRecord) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO notification_records (
                id, notification_id, event_kind, event_subtype,
                original_transaction_id, raw_payload, processing_status,
                error_message, received_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.id)
        .bind(record.notification_id.as_ref().map(|id| id.as_str()))
        .bind(record.event_kind.as_str())
        .bind(record.event_subtype.as_deref())
        .bind(record.original_transaction_id.as_ref().map(|id| id.as_str()))
        .bind(record.raw_payload.as_str())
        .bind(record.processing_status.as_str())
        .bind(record.error_message.as_deref())
        .bind(*record.received_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to append notification record: {}", e))
        })?;

        Ok(())
    }

    async fn summarize_since(&self, since: Timestamp) -> Result<ProcessingSummary, DomainError> {
        let row: SummaryRow = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE processing_status = 'failed') AS failed,
                MAX(received_at) AS last_received_at
            FROM notification_records
            WHERE received_at >= $1
            "#,
        )
        .bind(*since.as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to summarize notification records: {}", e))
        })?;

        Ok(row.into())
    }

    async fn history(
        &self,
        id: &OriginalTransactionId,
    ) -> Result<Vec<NotificationRecord>, DomainError> {
        let rows: Vec<NotificationRecordRow> = sqlx::query_as(
            r#"
            SELECT id, notification_id, event_kind, event_subtype,
                   original_transaction_id, raw_payload, processing_status,
                   error_message, received_at
            FROM notification_records
            WHERE original_transaction_id = $1
            ORDER BY received_at ASC, id ASC
            "#,
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to load notification history: {}", e))
        })?;

        rows.into_iter().map(NotificationRecord::try_from).collect()
    }
}
