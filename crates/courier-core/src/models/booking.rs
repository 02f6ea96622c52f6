//! Booking model
//!
//! A booking couples one consignment number with one price. Party, invoice
//! and payment details are carried through as opaque form data.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::entity::{EntityRef, EntityType};
use super::pricing::{DeliveryType, PriceBreakdown, ServiceType, TransportMode};

/// Booking status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Booked,
    /// Cancelled bookings keep their usage record
    Cancelled,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Booked => write!(f, "booked"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl BookingStatus {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "booked" => Some(BookingStatus::Booked),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

/// Freight-Paid or To-Pay settlement, recorded but not priced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SettlementType {
    #[default]
    #[serde(rename = "FP")]
    FreightPaid,
    #[serde(rename = "TP")]
    ToPay,
}

impl fmt::Display for SettlementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettlementType::FreightPaid => write!(f, "FP"),
            SettlementType::ToPay => write!(f, "TP"),
        }
    }
}

/// Sender or receiver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PartyDetails {
    pub name: String,
    pub mobile_number: String,
    pub pincode: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// What is being shipped and how
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentDetails {
    pub service_type: ServiceType,
    /// Grams for DOX, kilograms for non-DOX
    pub weight: Decimal,
    #[serde(default)]
    pub by_air: bool,
    #[serde(default)]
    pub priority: bool,
    /// Price as a reverse shipment into Assam / North-East
    #[serde(default)]
    pub reverse: bool,
    #[serde(default)]
    pub transport_mode: Option<TransportMode>,
    #[serde(default)]
    pub delivery_type: Option<DeliveryType>,
    #[serde(default = "default_pieces")]
    pub pieces: u32,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_pieces() -> u32 {
    1
}

/// Persisted booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub booking_reference: String,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub consignment_number: i64,
    /// Usage record holding the consignment number
    pub usage_id: Uuid,
    pub origin: PartyDetails,
    pub destination: PartyDetails,
    pub shipment: ShipmentDetails,
    pub invoice: serde_json::Value,
    pub payment: serde_json::Value,
    pub settlement: SettlementType,
    pub price_breakdown: PriceBreakdown,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Time-ordered booking reference
    pub fn new_reference() -> String {
        format!("BK{}", Uuid::now_v7().simple()).to_uppercase()
    }

    /// Owning entity
    pub fn entity(&self) -> EntityRef {
        EntityRef::new(self.entity_type, self.entity_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_reference_format() {
        let a = Booking::new_reference();
        let b = Booking::new_reference();
        assert!(a.starts_with("BK"));
        assert_eq!(a.len(), 34);
        assert_ne!(a, b);
    }

    #[test]
    fn test_settlement_serde() {
        assert_eq!(
            serde_json::to_string(&SettlementType::ToPay).unwrap(),
            "\"TP\""
        );
        let parsed: SettlementType = serde_json::from_str("\"FP\"").unwrap();
        assert_eq!(parsed, SettlementType::FreightPaid);
    }

    #[test]
    fn test_shipment_defaults() {
        let shipment: ShipmentDetails = serde_json::from_value(serde_json::json!({
            "serviceType": "non-dox",
            "weight": 12.5
        }))
        .unwrap();
        assert_eq!(shipment.pieces, 1);
        assert!(!shipment.reverse);
        assert!(shipment.transport_mode.is_none());
    }
}
