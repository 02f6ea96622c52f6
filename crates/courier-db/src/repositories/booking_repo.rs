//! Booking repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_core::{
    models::{
        Booking, BookingStatus, PartyDetails, PriceBreakdown, SettlementType, ShipmentDetails,
        UsageRecord,
    },
    traits::BookingStore,
    AppError, AppResult,
};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use super::range_repo::parse_entity_type;
use super::usage_repo::insert_usage;

/// PostgreSQL implementation of BookingStore
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    /// Create a new booking store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    #[instrument(skip(self, usage, booking), fields(reference = %booking.booking_reference, consignment_number = usage.consignment_number))]
    async fn persist(
        &self,
        usage: &UsageRecord,
        booking: &Booking,
    ) -> AppResult<(UsageRecord, Booking)> {
        // Dropping the transaction before commit rolls back both inserts
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        let usage = insert_usage(&mut *tx, usage).await?;

        let row = sqlx::query_as::<sqlx::Postgres, BookingRow>(
            r#"
            INSERT INTO bookings (
                id, booking_reference, entity_type, entity_id, consignment_number,
                usage_id, origin, destination, shipment, invoice, payment,
                settlement, price_breakdown, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING
                id, booking_reference, entity_type, entity_id, consignment_number,
                usage_id, origin, destination, shipment, invoice, payment,
                settlement, price_breakdown, status, created_at
            "#,
        )
        .bind(booking.id)
        .bind(&booking.booking_reference)
        .bind(booking.entity_type.to_string())
        .bind(&booking.entity_id)
        .bind(booking.consignment_number)
        .bind(booking.usage_id)
        .bind(Json(&booking.origin))
        .bind(Json(&booking.destination))
        .bind(Json(&booking.shipment))
        .bind(Json(&booking.invoice))
        .bind(Json(&booking.payment))
        .bind(booking.settlement.to_string())
        .bind(Json(&booking.price_breakdown))
        .bind(booking.status.to_string())
        .bind(booking.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error persisting booking: {}", e);
            match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::Conflict(
                    format!("Booking {} already exists", booking.booking_reference),
                ),
                other => AppError::Database(format!("Failed to persist booking: {}", other)),
            }
        })?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;

        info!(
            consignment_number = booking.consignment_number,
            "Booking persisted"
        );
        Ok((usage, row.try_into_model()?))
    }

    #[instrument(skip(self))]
    async fn find_by_reference(&self, reference: &str) -> AppResult<Option<Booking>> {
        debug!("Finding booking by reference: {}", reference);

        let row = sqlx::query_as::<sqlx::Postgres, BookingRow>(
            r#"
            SELECT
                id, booking_reference, entity_type, entity_id, consignment_number,
                usage_id, origin, destination, shipment, invoice, payment,
                settlement, price_breakdown, status, created_at
            FROM bookings
            WHERE booking_reference = $1
            "#,
        )
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding booking {}: {}", reference, e);
            AppError::Database(format!("Failed to find booking: {}", e))
        })?;

        row.map(BookingRow::try_into_model).transpose()
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    booking_reference: String,
    entity_type: String,
    entity_id: String,
    consignment_number: i64,
    usage_id: Uuid,
    origin: Json<PartyDetails>,
    destination: Json<PartyDetails>,
    shipment: Json<ShipmentDetails>,
    invoice: Json<serde_json::Value>,
    payment: Json<serde_json::Value>,
    settlement: String,
    price_breakdown: Json<PriceBreakdown>,
    status: String,
    created_at: DateTime<Utc>,
}

impl BookingRow {
    fn try_into_model(self) -> AppResult<Booking> {
        let settlement = parse_settlement(&self.settlement)?;
        let status = BookingStatus::from_str(&self.status)
            .ok_or_else(|| AppError::Database(format!("Unknown booking status: {}", self.status)))?;

        Ok(Booking {
            id: self.id,
            booking_reference: self.booking_reference,
            entity_type: parse_entity_type(&self.entity_type)?,
            entity_id: self.entity_id,
            consignment_number: self.consignment_number,
            usage_id: self.usage_id,
            origin: self.origin.0,
            destination: self.destination.0,
            shipment: self.shipment.0,
            invoice: self.invoice.0,
            payment: self.payment.0,
            settlement,
            price_breakdown: self.price_breakdown.0,
            status,
            created_at: self.created_at,
        })
    }
}

fn parse_settlement(s: &str) -> AppResult<SettlementType> {
    match s {
        "FP" => Ok(SettlementType::FreightPaid),
        "TP" => Ok(SettlementType::ToPay),
        other => Err(AppError::Database(format!("Unknown settlement type: {}", other))),
    }
}
