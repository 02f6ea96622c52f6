//! Tariff version repository implementation
//!
//! Versions are append-only. The active version is the one with the latest
//! `effective_from` not after the pricing instant.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_core::{
    models::{TariffTable, TariffVersion},
    traits::TariffRepository,
    AppError, AppResult,
};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, error, info, instrument};

/// PostgreSQL implementation of TariffRepository
pub struct PgTariffRepository {
    pool: PgPool,
}

impl PgTariffRepository {
    /// Create a new tariff repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TariffRepository for PgTariffRepository {
    #[instrument(skip(self))]
    async fn find_active(&self, at: DateTime<Utc>) -> AppResult<Option<TariffVersion>> {
        debug!("Loading tariff effective at {}", at);

        let row = sqlx::query_as::<sqlx::Postgres, TariffRow>(
            r#"
            SELECT id, effective_from, rates, created_at
            FROM tariff_versions
            WHERE effective_from <= $1
            ORDER BY effective_from DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error loading tariff: {}", e);
            AppError::Database(format!("Failed to load tariff: {}", e))
        })?;

        Ok(row.map(TariffVersion::from))
    }

    #[instrument(skip(self))]
    async fn next_effective_from(
        &self,
        after: DateTime<Utc>,
    ) -> AppResult<Option<DateTime<Utc>>> {
        let next: (Option<DateTime<Utc>>,) = sqlx::query_as(
            "SELECT MIN(effective_from) FROM tariff_versions WHERE effective_from > $1",
        )
        .bind(after)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error loading next tariff: {}", e);
            AppError::Database(format!("Failed to load next tariff: {}", e))
        })?;

        Ok(next.0)
    }

    #[instrument(skip(self, version), fields(effective_from = %version.effective_from))]
    async fn create(&self, version: &TariffVersion) -> AppResult<TariffVersion> {
        version.rates.validate()?;

        let row = sqlx::query_as::<sqlx::Postgres, TariffRow>(
            r#"
            INSERT INTO tariff_versions (effective_from, rates, created_at)
            VALUES ($1, $2, $3)
            RETURNING id, effective_from, rates, created_at
            "#,
        )
        .bind(version.effective_from)
        .bind(Json(&version.rates))
        .bind(version.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating tariff: {}", e);
            AppError::Database(format!("Failed to create tariff: {}", e))
        })?;

        let created = TariffVersion::from(row);
        info!(id = created.id, "Tariff version stored");
        Ok(created)
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct TariffRow {
    id: i64,
    effective_from: DateTime<Utc>,
    rates: Json<TariffTable>,
    created_at: DateTime<Utc>,
}

impl From<TariffRow> for TariffVersion {
    fn from(row: TariffRow) -> Self {
        TariffVersion {
            id: row.id,
            effective_from: row.effective_from,
            rates: row.rates.0,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_incomplete_tariff_rejected() {
        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/courier_booking".to_string());
        let pool = PgPool::connect(&url).await.unwrap();
        crate::run_migrations(&pool).await.unwrap();

        let repo = PgTariffRepository::new(pool);
        let result = repo
            .create(&TariffVersion::new(TariffTable::default(), Utc::now()))
            .await;
        assert!(matches!(result, Err(AppError::TariffConfigurationMissing(_))));
    }
}
