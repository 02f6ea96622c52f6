//! Tariff models
//!
//! A tariff version is immutable, administratively created configuration
//! read by the rate engine. Every rate the engine can reach must be present:
//! a missing entry is a configuration error, never a zero price. Unknown
//! keys are rejected when the tariff is loaded.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::pricing::{DeliveryType, TransportMode};
use super::zone::Zone;
use crate::error::AppError;

/// Weight slab of the DOX and priority tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeightSlab {
    #[serde(rename = "01gm-250gm")]
    UpTo250g,
    #[serde(rename = "251gm-500gm")]
    From251To500g,
    #[serde(rename = "01gm-500gm")]
    UpTo500g,
    #[serde(rename = "add500gm")]
    Additional500g,
}

impl WeightSlab {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightSlab::UpTo250g => "01gm-250gm",
            WeightSlab::From251To500g => "251gm-500gm",
            WeightSlab::UpTo500g => "01gm-500gm",
            WeightSlab::Additional500g => "add500gm",
        }
    }
}

impl fmt::Display for WeightSlab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reverse-pricing destination class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DestinationClass {
    #[serde(rename = "toAssam")]
    Assam,
    #[serde(rename = "toNorthEast")]
    NorthEast,
}

impl DestinationClass {
    pub const ALL: [DestinationClass; 2] = [DestinationClass::Assam, DestinationClass::NorthEast];

    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationClass::Assam => "toAssam",
            DestinationClass::NorthEast => "toNorthEast",
        }
    }
}

impl fmt::Display for DestinationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rate per pricing zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ZoneRates {
    pub assam: Option<Decimal>,
    pub ne_by_surface: Option<Decimal>,
    pub ne_by_air_agt_imp: Option<Decimal>,
    pub rest_of_india: Option<Decimal>,
    /// Optional dedicated column; falls back to `rest_of_india`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kolkata: Option<Decimal>,
}

impl ZoneRates {
    /// Rate for a zone, folding Kolkata into rest of India
    pub fn get(&self, zone: Zone) -> Option<Decimal> {
        match zone {
            Zone::Assam => self.assam,
            Zone::NeBySurface => self.ne_by_surface,
            Zone::NeByAirAgtImp => self.ne_by_air_agt_imp,
            Zone::RestOfIndia => self.rest_of_india,
            Zone::Kolkata => self.kolkata.or(self.rest_of_india),
        }
    }
}

/// DOX slab rates for non-priority shipments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct DoxPricing {
    #[serde(rename = "01gm-250gm", default)]
    pub up_to_250g: ZoneRates,
    #[serde(rename = "251gm-500gm", default)]
    pub from_251_to_500g: ZoneRates,
    #[serde(rename = "add500gm", default)]
    pub additional_500g: ZoneRates,
}

impl DoxPricing {
    pub fn slab(&self, slab: WeightSlab) -> Option<&ZoneRates> {
        match slab {
            WeightSlab::UpTo250g => Some(&self.up_to_250g),
            WeightSlab::From251To500g => Some(&self.from_251_to_500g),
            WeightSlab::Additional500g => Some(&self.additional_500g),
            WeightSlab::UpTo500g => None,
        }
    }
}

/// DOX slab rates for priority shipments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct PriorityPricing {
    #[serde(rename = "01gm-500gm", default)]
    pub up_to_500g: ZoneRates,
    #[serde(rename = "add500gm", default)]
    pub additional_500g: ZoneRates,
}

impl PriorityPricing {
    pub fn slab(&self, slab: WeightSlab) -> Option<&ZoneRates> {
        match slab {
            WeightSlab::UpTo500g => Some(&self.up_to_500g),
            WeightSlab::Additional500g => Some(&self.additional_500g),
            _ => None,
        }
    }
}

/// Per-kg reverse rates by delivery type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeliveryRates {
    pub normal_delivery: Option<Decimal>,
    pub priority_delivery: Option<Decimal>,
}

impl DeliveryRates {
    pub fn get(&self, delivery: DeliveryType) -> Option<Decimal> {
        match delivery {
            DeliveryType::NormalDelivery => self.normal_delivery,
            DeliveryType::PriorityDelivery => self.priority_delivery,
        }
    }
}

/// Reverse rates by transport mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ModeRates {
    #[serde(default)]
    pub by_road: DeliveryRates,
    #[serde(default)]
    pub by_train: DeliveryRates,
    #[serde(default)]
    pub by_flight: DeliveryRates,
}

impl ModeRates {
    pub fn get(&self, mode: TransportMode) -> &DeliveryRates {
        match mode {
            TransportMode::ByRoad => &self.by_road,
            TransportMode::ByTrain => &self.by_train,
            TransportMode::ByFlight => &self.by_flight,
        }
    }
}

/// Reverse rates by destination class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReversePricing {
    #[serde(default)]
    pub to_assam: ModeRates,
    #[serde(default)]
    pub to_north_east: ModeRates,
}

impl ReversePricing {
    pub fn get(&self, class: DestinationClass) -> &ModeRates {
        match class {
            DestinationClass::Assam => &self.to_assam,
            DestinationClass::NorthEast => &self.to_north_east,
        }
    }
}

/// Minimum billable kilograms per transport mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MinChargeableWeight {
    pub by_road: Option<Decimal>,
    pub by_train: Option<Decimal>,
    pub by_flight: Option<Decimal>,
}

impl MinChargeableWeight {
    pub fn get(&self, mode: TransportMode) -> Option<Decimal> {
        match mode {
            TransportMode::ByRoad => self.by_road,
            TransportMode::ByTrain => self.by_train,
            TransportMode::ByFlight => self.by_flight,
        }
    }
}

/// Complete rate table of one tariff version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TariffTable {
    #[serde(default)]
    pub dox_pricing: DoxPricing,
    #[serde(default)]
    pub non_dox_surface_pricing: ZoneRates,
    #[serde(default)]
    pub non_dox_air_pricing: ZoneRates,
    #[serde(default)]
    pub priority_pricing: PriorityPricing,
    #[serde(default)]
    pub reverse_pricing: ReversePricing,
    #[serde(default)]
    pub min_chargeable_weight: MinChargeableWeight,
}

/// Zones the forward tables must price
const PRICED_ZONES: [Zone; 4] = [
    Zone::Assam,
    Zone::NeBySurface,
    Zone::NeByAirAgtImp,
    Zone::RestOfIndia,
];

/// Surface routes never classify into the air-sensitive NE column
const SURFACE_ZONES: [Zone; 3] = [Zone::Assam, Zone::NeBySurface, Zone::RestOfIndia];

fn missing(path: String) -> AppError {
    AppError::TariffConfigurationMissing(path)
}

impl TariffTable {
    /// DOX non-priority slab rate
    pub fn dox_rate(&self, slab: WeightSlab, zone: Zone) -> Result<Decimal, AppError> {
        self.dox_pricing
            .slab(slab)
            .and_then(|rates| rates.get(zone))
            .ok_or_else(|| missing(format!("doxPricing.{}.{}", slab, zone)))
    }

    /// DOX priority slab rate
    pub fn priority_rate(&self, slab: WeightSlab, zone: Zone) -> Result<Decimal, AppError> {
        self.priority_pricing
            .slab(slab)
            .and_then(|rates| rates.get(zone))
            .ok_or_else(|| missing(format!("priorityPricing.{}.{}", slab, zone)))
    }

    /// Forward non-DOX per-kg rate
    pub fn non_dox_rate(&self, by_air: bool, zone: Zone) -> Result<Decimal, AppError> {
        let (table, name) = if by_air {
            (&self.non_dox_air_pricing, "nonDoxAirPricing")
        } else {
            (&self.non_dox_surface_pricing, "nonDoxSurfacePricing")
        };
        table
            .get(zone)
            .ok_or_else(|| missing(format!("{}.{}", name, zone)))
    }

    /// Reverse per-kg rate
    pub fn reverse_rate(
        &self,
        class: DestinationClass,
        mode: TransportMode,
        delivery: DeliveryType,
    ) -> Result<Decimal, AppError> {
        self.reverse_pricing
            .get(class)
            .get(mode)
            .get(delivery)
            .ok_or_else(|| missing(format!("reversePricing.{}.{}.{}", class, mode, delivery)))
    }

    /// Minimum chargeable kilograms for a reverse transport mode
    pub fn min_chargeable_weight(&self, mode: TransportMode) -> Result<Decimal, AppError> {
        self.min_chargeable_weight
            .get(mode)
            .ok_or_else(|| missing(format!("minChargeableWeight.{}", mode)))
    }

    /// List every reachable entry that is absent or negative
    pub fn problems(&self) -> Vec<String> {
        let mut lookups: Vec<Result<Decimal, AppError>> = Vec::new();

        for zone in PRICED_ZONES {
            for slab in [
                WeightSlab::UpTo250g,
                WeightSlab::From251To500g,
                WeightSlab::Additional500g,
            ] {
                lookups.push(self.dox_rate(slab, zone));
            }
            for slab in [WeightSlab::UpTo500g, WeightSlab::Additional500g] {
                lookups.push(self.priority_rate(slab, zone));
            }
            lookups.push(self.non_dox_rate(true, zone));
        }
        for zone in SURFACE_ZONES {
            lookups.push(self.non_dox_rate(false, zone));
        }
        for mode in TransportMode::ALL {
            for class in DestinationClass::ALL {
                for delivery in DeliveryType::ALL {
                    lookups.push(self.reverse_rate(class, mode, delivery));
                }
            }
            lookups.push(self.min_chargeable_weight(mode));
        }

        let mut problems: Vec<String> = lookups
            .into_iter()
            .filter_map(|lookup| match lookup {
                Err(AppError::TariffConfigurationMissing(path)) => Some(path),
                Err(other) => Some(other.to_string()),
                Ok(value) if value < Decimal::ZERO => Some(format!("negative rate {}", value)),
                Ok(_) => None,
            })
            .collect();
        problems.dedup();
        problems
    }

    /// Fail with `TariffConfigurationMissing` unless every reachable entry is set
    pub fn validate(&self) -> Result<(), AppError> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(AppError::TariffConfigurationMissing(problems.join(", ")))
        }
    }
}

/// Versioned, read-only tariff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TariffVersion {
    pub id: i64,
    /// The version applies to bookings priced at or after this instant
    pub effective_from: DateTime<Utc>,
    pub rates: TariffTable,
    pub created_at: DateTime<Utc>,
}

impl TariffVersion {
    pub fn new(rates: TariffTable, effective_from: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            effective_from,
            rates,
            created_at: Utc::now(),
        }
    }
}
