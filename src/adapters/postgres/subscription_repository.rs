//! PostgreSQL implementation of SubscriptionRepository.
//!
//! `transition` runs inside one transaction: the row is read with
//! `SELECT ... FOR UPDATE`, the lifecycle computation runs against it, and
//! the result is written before commit. A concurrent transition for the same
//! original transaction id blocks on the row lock until then. Two first
//! deliveries racing with no row yet both compute `Create` and the upsert
//! keeps the later one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::foundation::{DomainError, ErrorCode, OriginalTransactionId, OwnerId, Timestamp};
use crate::domain::subscription::{LifecycleError, PlanKey, Subscription, SubscriptionStatus, Transition};
use crate::ports::{SubscriptionRepository, TransitionError, TransitionFn};

const SELECT_COLUMNS: &str = r#"
    SELECT original_transaction_id, owner_id, plan_key, status, product_id,
           storage_quota, auto_renew, subscription_start_at, renews_at,
           grace_period_end_at, canceled_at, deletion_scheduled_at, updated_at
    FROM subscriptions
    WHERE original_transaction_id = $1
"#;

/// PostgreSQL implementation of the SubscriptionRepository port.
pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_row(
        tx: &mut Transaction<'_, Postgres>,
        id: &OriginalTransactionId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> =
            sqlx::query_as(&format!("{} FOR UPDATE", SELECT_COLUMNS))
                .bind(id.as_str())
                .fetch_optional(&mut **tx)
                .await
                .map_err(|e| {
                    DomainError::database(format!("Failed to lock subscription: {}", e))
                })?;

        row.map(Subscription::try_from).transpose()
    }

    async fn upsert(
        tx: &mut Transaction<'_, Postgres>,
        sub: &Subscription,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                original_transaction_id, owner_id, plan_key, status, product_id,
                storage_quota, auto_renew, subscription_start_at, renews_at,
                grace_period_end_at, canceled_at, deletion_scheduled_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (original_transaction_id) DO UPDATE SET
                owner_id = EXCLUDED.owner_id,
                plan_key = EXCLUDED.plan_key,
                status = EXCLUDED.status,
                product_id = EXCLUDED.product_id,
                storage_quota = EXCLUDED.storage_quota,
                auto_renew = EXCLUDED.auto_renew,
                subscription_start_at = EXCLUDED.subscription_start_at,
                renews_at = EXCLUDED.renews_at,
                grace_period_end_at = EXCLUDED.grace_period_end_at,
                canceled_at = EXCLUDED.canceled_at,
                deletion_scheduled_at = EXCLUDED.deletion_scheduled_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(sub.original_transaction_id.as_str())
        .bind(sub.owner_id.as_str())
        .bind(sub.plan_key.as_str())
        .bind(sub.status.as_str())
        .bind(sub.product_id.as_str())
        .bind(sub.storage_quota)
        .bind(sub.auto_renew)
        .bind(*sub.subscription_start_at.as_datetime())
        .bind(sub.renews_at.map(|t| *t.as_datetime()))
        .bind(sub.grace_period_end_at.map(|t| *t.as_datetime()))
        .bind(sub.canceled_at.map(|t| *t.as_datetime()))
        .bind(sub.deletion_scheduled_at.map(|t| *t.as_datetime()))
        .bind(*sub.updated_at.as_datetime())
        .execute(&mut **tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to upsert subscription: {}", e)))?;

        Ok(())
    }

    /// Returns false when no row matched.
    async fn update(
        tx: &mut Transaction<'_, Postgres>,
        sub: &Subscription,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                owner_id = $2,
                plan_key = $3,
                status = $4,
                product_id = $5,
                storage_quota = $6,
                auto_renew = $7,
                subscription_start_at = $8,
                renews_at = $9,
                grace_period_end_at = $10,
                canceled_at = $11,
                deletion_scheduled_at = $12,
                updated_at = $13
            WHERE original_transaction_id = $1
            "#,
        )
        .bind(sub.original_transaction_id.as_str())
        .bind(sub.owner_id.as_str())
        .bind(sub.plan_key.as_str())
        .bind(sub.status.as_str())
        .bind(sub.product_id.as_str())
        .bind(sub.storage_quota)
        .bind(sub.auto_renew)
        .bind(*sub.subscription_start_at.as_datetime())
        .bind(sub.renews_at.map(|t| *t.as_datetime()))
        .bind(sub.grace_period_end_at.map(|t| *t.as_datetime()))
        .bind(sub.canceled_at.map(|t| *t.as_datetime()))
        .bind(sub.deletion_scheduled_at.map(|t| *t.as_datetime()))
        .bind(*sub.updated_at.as_datetime())
        .execute(&mut **tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update subscription: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }
}

/// Database row representation of a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    original_transaction_id: String,
    owner_id: String,
    plan_key: String,
    status: String,
    product_id: String,
    storage_quota: i64,
    auto_renew: bool,
    subscription_start_at: DateTime<Utc>,
    renews_at: Option<DateTime<Utc>>,
    grace_period_end_at: Option<DateTime<Utc>>,
    canceled_at: Option<DateTime<Utc>>,
    deletion_scheduled_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let invalid = |field: &str, e: &dyn std::fmt::Display| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid {}: {}", field, e))
        };

        Ok(Subscription {
            original_transaction_id: OriginalTransactionId::new(row.original_transaction_id)
                .map_err(|e| invalid("original_transaction_id", &e))?,
            owner_id: OwnerId::new(row.owner_id).map_err(|e| invalid("owner_id", &e))?,
            plan_key: row
                .plan_key
                .parse::<PlanKey>()
                .map_err(|e| invalid("plan_key", &e))?,
            status: row
                .status
                .parse::<SubscriptionStatus>()
                .map_err(|e| invalid("status", &e))?,
            product_id: row.product_id,
            storage_quota: row.storage_quota,
            auto_renew: row.auto_renew,
            subscription_start_at: Timestamp::from_datetime(row.subscription_start_at),
            renews_at: row.renews_at.map(Timestamp::from_datetime),
            grace_period_end_at: row.grace_period_end_at.map(Timestamp::from_datetime),
            canceled_at: row.canceled_at.map(Timestamp::from_datetime),
            deletion_scheduled_at: row.deletion_scheduled_at.map(Timestamp::from_datetime),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn find(
        &self,
        id: &OriginalTransactionId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(SELECT_COLUMNS)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to find subscription: {}", e)))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn transition(
        &self,
        id: &OriginalTransactionId,
        compute: &TransitionFn<'_>,
    ) -> Result<Transition, TransitionError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            DomainError::database(format!("Failed to begin transaction: {}", e))
        })?;

        let current = Self::lock_row(&mut tx, id).await?;
        let transition = compute(current.as_ref())?;

        match &transition {
            Transition::Create(sub) => Self::upsert(&mut tx, sub).await?,
            Transition::Update(sub) => {
                if !Self::update(&mut tx, sub).await? {
                    return Err(LifecycleError::Orphan(id.clone()).into());
                }
            }
            Transition::Unchanged { .. } => {}
        }

        tx.commit().await.map_err(|e| {
            DomainError::database(format!("Failed to commit transaction: {}", e))
        })?;

        Ok(transition)
    }
}
