//! Consignment availability and usage DTOs

use chrono::{DateTime, Utc};
use courier_core::models::{AllocationSummary, EntityRef, EntityType, UsageRecord};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Advisory capacity of the calling entity
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsignmentCheckResponse {
    pub entity_type: EntityType,
    pub entity_id: String,
    #[serde(flatten)]
    pub summary: AllocationSummary,
}

impl ConsignmentCheckResponse {
    pub fn new(entity: &EntityRef, summary: AllocationSummary) -> Self {
        Self {
            entity_type: entity.entity_type,
            entity_id: entity.entity_id.clone(),
            summary,
        }
    }
}

/// One used consignment number
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecordResponse {
    pub id: Uuid,
    pub consignment_number: i64,
    pub booking_reference: Option<String>,
    pub final_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl From<UsageRecord> for UsageRecordResponse {
    fn from(record: UsageRecord) -> Self {
        Self {
            id: record.id,
            consignment_number: record.consignment_number,
            booking_reference: record.booking_reference,
            final_price: record.price_breakdown.map(|p| p.final_price),
            created_at: record.created_at,
        }
    }
}
