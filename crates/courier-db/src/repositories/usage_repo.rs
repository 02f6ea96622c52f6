//! Consignment usage repository implementation
//!
//! The unique index on `(entity_type, entity_id, consignment_number)` is the
//! arbiter of allocation races: an insert that loses the race returns no row
//! and surfaces as `AllocationConflict`, which the allocator retries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_core::{
    models::{EntityRef, PriceBreakdown, UsageRecord},
    traits::UsageLedger,
    AppError, AppResult,
};
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use super::range_repo::parse_entity_type;

/// PostgreSQL implementation of UsageLedger
pub struct PgUsageLedger {
    pool: PgPool,
}

impl PgUsageLedger {
    /// Create a new usage ledger
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Conditional usage insert shared by the ledger and the booking store
///
/// Inserts only while an active range still covers the number; a concurrent
/// winner or a revoked range both yield no row.
pub(crate) async fn insert_usage<'e, E>(executor: E, record: &UsageRecord) -> AppResult<UsageRecord>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<sqlx::Postgres, UsageRow>(
        r#"
        INSERT INTO consignment_usage (
            id, entity_type, entity_id, consignment_number,
            booking_reference, price_breakdown, created_at
        )
        SELECT $1, $2, $3, $4, $5, $6, $7
        WHERE EXISTS (
            SELECT 1
            FROM consignment_ranges
            WHERE entity_type = $2
                AND entity_id = $3
                AND is_active
                AND $4 BETWEEN start_number AND end_number
        )
        ON CONFLICT (entity_type, entity_id, consignment_number) DO NOTHING
        RETURNING
            id, entity_type, entity_id, consignment_number,
            booking_reference, price_breakdown, created_at
        "#,
    )
    .bind(record.id)
    .bind(record.entity_type.to_string())
    .bind(&record.entity_id)
    .bind(record.consignment_number)
    .bind(&record.booking_reference)
    .bind(record.price_breakdown.as_ref().map(Json))
    .bind(record.created_at)
    .fetch_optional(executor)
    .await
    .map_err(|e| {
        error!("Database error reserving consignment number: {}", e);
        AppError::Database(format!("Failed to reserve consignment number: {}", e))
    })?;

    match row {
        Some(row) => row.try_into_model(),
        None => {
            debug!("Consignment number lost to a concurrent booking or revoked range");
            Err(AppError::AllocationConflict(format!(
                "Consignment number {} is no longer available to {}",
                record.consignment_number,
                record.entity()
            )))
        }
    }
}

#[async_trait]
impl UsageLedger for PgUsageLedger {
    #[instrument(skip(self, record), fields(entity = %record.entity(), consignment_number = record.consignment_number))]
    async fn reserve(&self, record: &UsageRecord) -> AppResult<UsageRecord> {
        insert_usage(&self.pool, record).await
    }

    #[instrument(skip(self))]
    async fn release(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM consignment_usage
            WHERE id = $1
                AND NOT EXISTS (SELECT 1 FROM bookings WHERE usage_id = $1)
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error releasing reservation {}: {}", id, e);
            AppError::Database(format!("Failed to release reservation: {}", e))
        })?;

        let released = result.rows_affected() > 0;
        if released {
            warn!("Released consignment reservation {}", id);
        }
        Ok(released)
    }

    #[instrument(skip(self), fields(entity = %entity))]
    async fn used_numbers(&self, entity: &EntityRef) -> AppResult<Vec<i64>> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT consignment_number
            FROM consignment_usage
            WHERE entity_type = $1 AND entity_id = $2
            ORDER BY consignment_number ASC
            "#,
        )
        .bind(entity.entity_type.to_string())
        .bind(&entity.entity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error loading used numbers: {}", e);
            AppError::Database(format!("Failed to load used numbers: {}", e))
        })?;

        Ok(rows.into_iter().map(|(n,)| n).collect())
    }

    #[instrument(skip(self), fields(entity = %entity))]
    async fn find_by_number(
        &self,
        entity: &EntityRef,
        consignment_number: i64,
    ) -> AppResult<Option<UsageRecord>> {
        let row = sqlx::query_as::<sqlx::Postgres, UsageRow>(
            r#"
            SELECT
                id, entity_type, entity_id, consignment_number,
                booking_reference, price_breakdown, created_at
            FROM consignment_usage
            WHERE entity_type = $1 AND entity_id = $2 AND consignment_number = $3
            "#,
        )
        .bind(entity.entity_type.to_string())
        .bind(&entity.entity_id)
        .bind(consignment_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding usage: {}", e);
            AppError::Database(format!("Failed to find usage: {}", e))
        })?;

        row.map(UsageRow::try_into_model).transpose()
    }

    #[instrument(skip(self), fields(entity = %entity))]
    async fn list_by_entity(
        &self,
        entity: &EntityRef,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<UsageRecord>, i64)> {
        let rows = sqlx::query_as::<sqlx::Postgres, UsageRow>(
            r#"
            SELECT
                id, entity_type, entity_id, consignment_number,
                booking_reference, price_breakdown, created_at
            FROM consignment_usage
            WHERE entity_type = $1 AND entity_id = $2
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(entity.entity_type.to_string())
        .bind(&entity.entity_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing usage: {}", e);
            AppError::Database(format!("Failed to list usage: {}", e))
        })?;

        let total: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM consignment_usage WHERE entity_type = $1 AND entity_id = $2",
        )
        .bind(entity.entity_type.to_string())
        .bind(&entity.entity_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error counting usage: {}", e);
            AppError::Database(format!("Failed to count usage: {}", e))
        })?;

        let records = rows
            .into_iter()
            .map(UsageRow::try_into_model)
            .collect::<AppResult<Vec<_>>>()?;
        Ok((records, total.0))
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct UsageRow {
    id: Uuid,
    entity_type: String,
    entity_id: String,
    consignment_number: i64,
    booking_reference: Option<String>,
    price_breakdown: Option<Json<PriceBreakdown>>,
    created_at: DateTime<Utc>,
}

impl UsageRow {
    fn try_into_model(self) -> AppResult<UsageRecord> {
        Ok(UsageRecord {
            id: self.id,
            entity_type: parse_entity_type(&self.entity_type)?,
            entity_id: self.entity_id,
            consignment_number: self.consignment_number,
            booking_reference: self.booking_reference,
            price_breakdown: self.price_breakdown.map(|Json(price)| price),
            created_at: self.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::models::RangeAssignment;

    async fn test_pool() -> PgPool {
        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/courier_booking".to_string());
        let pool = PgPool::connect(&url).await.unwrap();
        crate::run_migrations(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_duplicate_reservation_conflicts() {
        use crate::PgRangeLedger;
        use courier_core::traits::RangeLedger;

        let pool = test_pool().await;
        let entity = EntityRef::corporate(format!("it-{}", Uuid::new_v4()));
        PgRangeLedger::new(pool.clone())
            .create(&RangeAssignment::new(&entity, 1, 10))
            .await
            .unwrap();

        let ledger = PgUsageLedger::new(pool);
        ledger
            .reserve(&UsageRecord::placeholder(&entity, 1))
            .await
            .unwrap();

        let second = ledger.reserve(&UsageRecord::placeholder(&entity, 1)).await;
        assert!(matches!(second, Err(AppError::AllocationConflict(_))));

        let outside = ledger.reserve(&UsageRecord::placeholder(&entity, 11)).await;
        assert!(matches!(outside, Err(AppError::AllocationConflict(_))));
    }
}
