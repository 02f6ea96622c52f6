//! Rate calculation and tariff DTOs

use chrono::{DateTime, Utc};
use courier_core::models::{
    DeliveryType, Pincode, RateRequest, ServiceType, TariffTable, TariffVersion, TransportMode,
};
use courier_core::{AppError, AppResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Rate calculation request
///
/// Fields arrive loosely typed from the booking form; conversion into a
/// [`RateRequest`] reports the first missing or malformed one.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RateCalculateRequest {
    #[serde(default)]
    #[validate(length(equal = 6))]
    pub from_pincode: Option<String>,

    #[validate(length(equal = 6))]
    pub to_pincode: Option<String>,

    /// Grams for DOX, kilograms for non-DOX
    pub weight: Option<Decimal>,

    pub service_type: Option<String>,

    #[serde(default)]
    pub by_air: bool,

    #[serde(default)]
    pub priority: bool,

    #[serde(default)]
    pub transport_mode: Option<TransportMode>,

    #[serde(default)]
    pub delivery_type: Option<DeliveryType>,
}

impl RateCalculateRequest {
    pub fn to_rate_request(&self) -> AppResult<RateRequest> {
        let to_pincode: Pincode = self
            .to_pincode
            .as_deref()
            .ok_or_else(|| AppError::MissingField("toPincode".to_string()))?
            .parse()?;
        let from_pincode = self
            .from_pincode
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<Pincode>)
            .transpose()?;
        let weight = self
            .weight
            .ok_or_else(|| AppError::MissingField("weight".to_string()))?;
        let service_type = ServiceType::parse(
            self.service_type
                .as_deref()
                .ok_or_else(|| AppError::MissingField("serviceType".to_string()))?,
        )?;

        let request = RateRequest {
            from_pincode,
            to_pincode,
            weight,
            service_type,
            by_air: self.by_air,
            priority: self.priority,
            transport_mode: self.transport_mode,
            delivery_type: self.delivery_type,
        };
        request.validate()?;
        Ok(request)
    }
}

/// Active tariff version
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TariffResponse {
    pub version: i64,
    pub effective_from: DateTime<Utc>,
    pub rates: TariffTable,
}

impl From<TariffVersion> for TariffResponse {
    fn from(tariff: TariffVersion) -> Self {
        Self {
            version: tariff.id,
            effective_from: tariff.effective_from,
            rates: tariff.rates,
        }
    }
}
