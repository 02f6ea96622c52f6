//! Pincode and pricing zone models
//!
//! Maps Indian postal pincodes to the pricing zones used by the tariff.
//! The numeric bands are business-mandated constants.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::error::AppError;

/// Six-digit Indian postal code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pincode(u32);

impl Pincode {
    /// Numeric value of the pincode
    #[inline]
    pub fn value(&self) -> u32 {
        self.0
    }

    #[inline]
    fn within(&self, band: &RangeInclusive<u32>) -> bool {
        band.contains(&self.0)
    }
}

impl FromStr for Pincode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let well_formed = trimmed.len() == 6
            && trimmed.bytes().all(|b| b.is_ascii_digit())
            && !trimmed.starts_with('0');

        if !well_formed {
            return Err(AppError::Validation(format!(
                "Malformed pincode '{}': expected six digits not starting with 0",
                s
            )));
        }

        trimmed
            .parse::<u32>()
            .map(Pincode)
            .map_err(|e| AppError::Validation(format!("Malformed pincode '{}': {}", s, e)))
    }
}

impl fmt::Display for Pincode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06}", self.0)
    }
}

impl Serialize for Pincode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Pincode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Pricing zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Zone {
    Assam,
    NeBySurface,
    NeByAirAgtImp,
    /// Kolkata metro; priced as rest of India unless the tariff carries
    /// a dedicated column
    Kolkata,
    RestOfIndia,
}

impl Zone {
    /// Every zone the classifier can produce
    pub const ALL: [Zone; 5] = [
        Zone::Assam,
        Zone::NeBySurface,
        Zone::NeByAirAgtImp,
        Zone::Kolkata,
        Zone::RestOfIndia,
    ];

    /// Tariff column name
    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Assam => "assam",
            Zone::NeBySurface => "neBySurface",
            Zone::NeByAirAgtImp => "neByAirAgtImp",
            Zone::Kolkata => "kolkata",
            Zone::RestOfIndia => "restOfIndia",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const ASSAM: RangeInclusive<u32> = 781_000..=788_999;
const KOLKATA: RangeInclusive<u32> = 700_000..=700_999;

/// Manipur and Tripura: air-serviced at the agent-import rate
const NE_AIR_SENSITIVE: [RangeInclusive<u32>; 2] = [795_000..=795_999, 799_000..=799_999];

/// Arunachal, Meghalaya, Mizoram, Nagaland and Sikkim: surface rate only
const NE_SURFACE_ONLY: [RangeInclusive<u32>; 5] = [
    790_000..=791_999,
    793_000..=793_999,
    796_000..=796_999,
    797_000..=797_999,
    737_000..=737_999,
];

/// Pincode to zone classifier
///
/// Stateless; safe to call from any number of tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZoneClassifier;

impl ZoneClassifier {
    /// Classify a destination pincode into a pricing zone
    pub fn classify(pincode: Pincode, is_air_route: bool) -> Zone {
        if pincode.within(&ASSAM) {
            return Zone::Assam;
        }
        if pincode.within(&KOLKATA) {
            return Zone::Kolkata;
        }
        if NE_AIR_SENSITIVE.iter().any(|band| pincode.within(band)) {
            return if is_air_route {
                Zone::NeByAirAgtImp
            } else {
                Zone::NeBySurface
            };
        }
        if NE_SURFACE_ONLY.iter().any(|band| pincode.within(band)) {
            return Zone::NeBySurface;
        }
        Zone::RestOfIndia
    }

    /// Destination lies in Assam
    pub fn is_assam(pincode: Pincode) -> bool {
        pincode.within(&ASSAM)
    }

    /// Destination lies in the North-East outside Assam
    pub fn is_north_east(pincode: Pincode) -> bool {
        NE_AIR_SENSITIVE
            .iter()
            .chain(NE_SURFACE_ONLY.iter())
            .any(|band| pincode.within(band))
    }
}
