//! Pricing request and price breakdown models

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::tariff::DestinationClass;
use super::zone::{Pincode, Zone};
use crate::error::AppError;

/// Goods and services tax applied on every base price
pub const GST_RATE: Decimal = dec!(0.18);

/// Shipment category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceType {
    /// Documents: flat weight slabs, weight in grams
    #[serde(rename = "dox")]
    Dox,
    /// Parcels: per-kg rates, weight in kilograms
    #[serde(rename = "non-dox")]
    NonDox,
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceType::Dox => write!(f, "dox"),
            ServiceType::NonDox => write!(f, "non-dox"),
        }
    }
}

impl ServiceType {
    /// Parse the booking form's service type
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s.trim().to_lowercase().as_str() {
            "dox" | "document" | "documents" => Ok(ServiceType::Dox),
            "non-dox" | "non_dox" | "nondox" | "parcel" => Ok(ServiceType::NonDox),
            _ => Err(AppError::InvalidServiceType(s.to_string())),
        }
    }
}

/// Transport mode of a reverse shipment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum TransportMode {
    #[default]
    ByRoad,
    ByTrain,
    ByFlight,
}

impl TransportMode {
    pub const ALL: [TransportMode; 3] = [
        TransportMode::ByRoad,
        TransportMode::ByTrain,
        TransportMode::ByFlight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::ByRoad => "byRoad",
            TransportMode::ByTrain => "byTrain",
            TransportMode::ByFlight => "byFlight",
        }
    }

    /// Air routes may classify into the air-sensitive North-East zone
    pub fn is_air(&self) -> bool {
        matches!(self, TransportMode::ByFlight)
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery speed of a reverse shipment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryType {
    #[default]
    NormalDelivery,
    PriorityDelivery,
}

impl DeliveryType {
    pub const ALL: [DeliveryType; 2] = [DeliveryType::NormalDelivery, DeliveryType::PriorityDelivery];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryType::NormalDelivery => "normalDelivery",
            DeliveryType::PriorityDelivery => "priorityDelivery",
        }
    }
}

impl fmt::Display for DeliveryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input of the rate engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateRequest {
    /// Origin; presence with a non-DOX shipment selects reverse pricing
    #[serde(default)]
    pub from_pincode: Option<Pincode>,
    pub to_pincode: Pincode,
    /// Grams for DOX, kilograms for non-DOX
    pub weight: Decimal,
    pub service_type: ServiceType,
    #[serde(default)]
    pub by_air: bool,
    #[serde(default)]
    pub priority: bool,
    #[serde(default)]
    pub transport_mode: Option<TransportMode>,
    #[serde(default)]
    pub delivery_type: Option<DeliveryType>,
}

impl RateRequest {
    /// Forward request with defaults for the optional flags
    pub fn forward(to_pincode: Pincode, weight: Decimal, service_type: ServiceType) -> Self {
        Self {
            from_pincode: None,
            to_pincode,
            weight,
            service_type,
            by_air: false,
            priority: false,
            transport_mode: None,
            delivery_type: None,
        }
    }

    /// Reverse pricing applies to non-DOX shipments with a known origin
    pub fn is_reverse(&self) -> bool {
        self.from_pincode.is_some() && self.service_type == ServiceType::NonDox
    }

    /// Reject requests that must never reach pricing or allocation
    pub fn validate(&self) -> Result<(), AppError> {
        if self.weight <= Decimal::ZERO {
            return Err(AppError::Validation(format!(
                "Weight must be positive, got {}",
                self.weight
            )));
        }
        Ok(())
    }
}

/// Itemized price of one shipment
///
/// Carries the tariff values actually applied so a stored booking can be
/// reproduced even after tariffs change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub service_type: ServiceType,
    pub zone: Zone,
    /// Set for reverse pricing only
    pub destination_class: Option<DestinationClass>,
    pub transport_mode: Option<TransportMode>,
    pub delivery_type: Option<DeliveryType>,
    pub priority: bool,
    pub by_air: bool,
    pub requested_weight: Decimal,
    pub chargeable_weight: Decimal,
    pub minimum_weight_applied: bool,
    /// Per-kg rate, or the flat slab rate for DOX
    pub price_per_unit: Decimal,
    /// Billed kilograms, or 1 for a DOX slab
    pub units: Decimal,
    /// Rate of each additional 500 g DOX slab
    pub additional_slab_rate: Option<Decimal>,
    /// Number of additional 500 g DOX slabs
    pub additional_slabs: u32,
    pub base_price: Decimal,
    pub gst_rate: Decimal,
    pub gst_amount: Decimal,
    pub final_price: Decimal,
    /// Tariff version the rates were read from
    pub tariff_version: i64,
}

impl PriceBreakdown {
    /// GST on a base price, additive and never compounded
    #[inline]
    pub fn gst_for(base_price: Decimal) -> Decimal {
        base_price * GST_RATE
    }
}
