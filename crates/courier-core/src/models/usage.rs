//! Consignment usage record model
//!
//! Append-only record of every consignment number actually consumed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{EntityRef, EntityType};
use super::pricing::PriceBreakdown;

/// Usage record entity
///
/// `(entity_type, entity_id, consignment_number)` is unique. A record is
/// created once per successful booking and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    /// Unique identifier (UUID)
    pub id: Uuid,

    /// Owning entity kind
    pub entity_type: EntityType,

    /// Owning entity identifier
    pub entity_id: String,

    /// Allocated consignment number
    pub consignment_number: i64,

    /// Booking the number was consumed by; empty for a bare reservation
    pub booking_reference: Option<String>,

    /// Price computed at booking time, embedded so it is never recomputed
    pub price_breakdown: Option<PriceBreakdown>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl UsageRecord {
    /// Record for a priced booking
    pub fn for_booking(
        entity: &EntityRef,
        consignment_number: i64,
        booking_reference: impl Into<String>,
        price_breakdown: PriceBreakdown,
    ) -> Self {
        Self {
            booking_reference: Some(booking_reference.into()),
            price_breakdown: Some(price_breakdown),
            ..Self::placeholder(entity, consignment_number)
        }
    }

    /// Bare reservation of a number
    pub fn placeholder(entity: &EntityRef, consignment_number: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_type: entity.entity_type,
            entity_id: entity.entity_id.clone(),
            consignment_number,
            booking_reference: None,
            price_breakdown: None,
            created_at: Utc::now(),
        }
    }

    /// Owning entity
    pub fn entity(&self) -> EntityRef {
        EntityRef::new(self.entity_type, self.entity_id.clone())
    }

    /// Check whether the record belongs to a booking
    pub fn is_placeholder(&self) -> bool {
        self.booking_reference.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_has_no_booking() {
        let record = UsageRecord::placeholder(&EntityRef::office("o-3"), 4200);
        assert!(record.is_placeholder());
        assert_eq!(record.entity(), EntityRef::office("o-3"));
        assert_eq!(record.consignment_number, 4200);
    }
}
