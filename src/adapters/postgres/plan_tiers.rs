//! Plan catalog loading.

use sqlx::PgPool;

use crate::adapters::memory::InMemoryPlanCatalog;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::subscription::{PlanKey, PlanTier};

#[derive(Debug, sqlx::FromRow)]
struct PlanTierRow {
    product_id: String,
    plan_key: String,
    storage_quota: i64,
}

impl TryFrom<PlanTierRow> for PlanTier {
    type Error = DomainError;

    fn try_from(row: PlanTierRow) -> Result<Self, Self::Error> {
        let plan_key = row.plan_key.parse::<PlanKey>().map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid plan_key: {}", e))
                .with_detail("product_id", row.product_id.clone())
        })?;
        Ok(PlanTier::new(row.product_id, plan_key, row.storage_quota))
    }
}

/// Loads every plan tier into an in-memory catalog.
///
/// The table is reference data maintained outside this service and is read
/// once at startup.
pub async fn load_plan_catalog(pool: &PgPool) -> Result<InMemoryPlanCatalog, DomainError> {
    let rows: Vec<PlanTierRow> = sqlx::query_as(
        "SELECT product_id, plan_key, storage_quota FROM plan_tiers ORDER BY product_id",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| DomainError::database(format!("Failed to load plan tiers: {}", e)))?;

    let tiers = rows
        .into_iter()
        .map(PlanTier::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(InMemoryPlanCatalog::new(tiers))
}
