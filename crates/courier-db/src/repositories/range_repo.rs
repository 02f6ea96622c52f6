//! Consignment range repository implementation
//!
//! PostgreSQL-backed range ledger. Ranges are created by an administrative
//! action and only ever soft-revoked.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_core::{
    models::{EntityRef, EntityType, RangeAssignment},
    traits::RangeLedger,
    AppError, AppResult,
};
use sqlx::PgPool;
use tracing::{error, info, instrument};

/// PostgreSQL implementation of RangeLedger
pub struct PgRangeLedger {
    pool: PgPool,
}

impl PgRangeLedger {
    /// Create a new range ledger
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RangeLedger for PgRangeLedger {
    #[instrument(skip(self, range), fields(entity = %range.entity()))]
    async fn create(&self, range: &RangeAssignment) -> AppResult<RangeAssignment> {
        if !range.is_well_formed() {
            return Err(AppError::Validation(format!(
                "Invalid range {}-{}",
                range.start_number, range.end_number
            )));
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        // Serialize range grants per entity for the overlap check
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(range.entity().to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Database(format!("Failed to lock entity ranges: {}", e)))?;

        let overlapping: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM consignment_ranges
            WHERE entity_type = $1
                AND entity_id = $2
                AND is_active
                AND start_number <= $4
                AND end_number >= $3
            "#,
        )
        .bind(range.entity_type.to_string())
        .bind(&range.entity_id)
        .bind(range.start_number)
        .bind(range.end_number)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error checking range overlap: {}", e);
            AppError::Database(format!("Failed to check range overlap: {}", e))
        })?;

        if overlapping.0 > 0 {
            return Err(AppError::Conflict(format!(
                "Range {}-{} overlaps an active range of {}",
                range.start_number,
                range.end_number,
                range.entity()
            )));
        }

        let row = sqlx::query_as::<sqlx::Postgres, RangeRow>(
            r#"
            INSERT INTO consignment_ranges (
                entity_type, entity_id, start_number, end_number, assigned_at, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, entity_type, entity_id, start_number, end_number, assigned_at, is_active
            "#,
        )
        .bind(range.entity_type.to_string())
        .bind(&range.entity_id)
        .bind(range.start_number)
        .bind(range.end_number)
        .bind(range.assigned_at)
        .bind(range.is_active)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error creating range: {}", e);
            AppError::Database(format!("Failed to create range: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;

        let created = row.try_into_model()?;
        info!(
            id = created.id,
            "Granted range {}-{}", created.start_number, created.end_number
        );
        Ok(created)
    }

    #[instrument(skip(self), fields(entity = %entity))]
    async fn find_active_by_entity(&self, entity: &EntityRef) -> AppResult<Vec<RangeAssignment>> {
        let rows = sqlx::query_as::<sqlx::Postgres, RangeRow>(
            r#"
            SELECT id, entity_type, entity_id, start_number, end_number, assigned_at, is_active
            FROM consignment_ranges
            WHERE entity_type = $1 AND entity_id = $2 AND is_active
            ORDER BY start_number ASC
            "#,
        )
        .bind(entity.entity_type.to_string())
        .bind(&entity.entity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error loading ranges: {}", e);
            AppError::Database(format!("Failed to load ranges: {}", e))
        })?;

        rows.into_iter().map(RangeRow::try_into_model).collect()
    }

    #[instrument(skip(self))]
    async fn set_active(&self, id: i64, is_active: bool) -> AppResult<RangeAssignment> {
        let row = sqlx::query_as::<sqlx::Postgres, RangeRow>(
            r#"
            UPDATE consignment_ranges
            SET is_active = $2
            WHERE id = $1
            RETURNING id, entity_type, entity_id, start_number, end_number, assigned_at, is_active
            "#,
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating range {}: {}", id, e);
            AppError::Database(format!("Failed to update range: {}", e))
        })?
        .ok_or_else(|| AppError::NotFound(format!("Range {} not found", id)))?;

        info!(id, is_active, "Range activation changed");
        row.try_into_model()
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct RangeRow {
    id: i64,
    entity_type: String,
    entity_id: String,
    start_number: i64,
    end_number: i64,
    assigned_at: DateTime<Utc>,
    is_active: bool,
}

impl RangeRow {
    fn try_into_model(self) -> AppResult<RangeAssignment> {
        let entity_type = parse_entity_type(&self.entity_type)?;
        Ok(RangeAssignment {
            id: self.id,
            entity_type,
            entity_id: self.entity_id,
            start_number: self.start_number,
            end_number: self.end_number,
            assigned_at: self.assigned_at,
            is_active: self.is_active,
        })
    }
}

/// Parse a stored entity type, treating unknown values as corruption
pub(crate) fn parse_entity_type(s: &str) -> AppResult<EntityType> {
    EntityType::from_str(s)
        .ok_or_else(|| AppError::Database(format!("Unknown entity type in ledger: {}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entity_type() {
        assert_eq!(parse_entity_type("corporate").unwrap(), EntityType::Corporate);
        assert_eq!(parse_entity_type("office").unwrap(), EntityType::Office);
        assert!(parse_entity_type("vendor").is_err());
    }

    #[test]
    fn test_row_conversion() {
        let row = RangeRow {
            id: 9,
            entity_type: "office".to_string(),
            entity_id: "o-1".to_string(),
            start_number: 100,
            end_number: 199,
            assigned_at: Utc::now(),
            is_active: true,
        };

        let range = row.try_into_model().unwrap();
        assert_eq!(range.entity(), EntityRef::office("o-1"));
        assert_eq!(range.total_numbers(), 100);
    }
}
