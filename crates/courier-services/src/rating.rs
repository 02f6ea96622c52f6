//! Rate engine
//!
//! Prices one shipment against one tariff version. Pure: no I/O, no clock,
//! no shared state, so identical input yields an identical breakdown.
//! Money is never rounded here; `ceil` applies to the slab count only.

use courier_core::{
    models::{
        tariff::WeightSlab, DestinationClass, PriceBreakdown, RateRequest, ServiceType,
        TariffVersion, Zone, ZoneClassifier, GST_RATE,
    },
    AppError, AppResult,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use crate::constants::{
    DOX_ADDITIONAL_SLAB_GRAMS, DOX_BASE_SLAB_GRAMS, DOX_FIRST_SLAB_GRAMS, MAX_WEIGHT,
};

/// Shipment pricing against a fixed tariff version
#[derive(Debug, Clone, Copy)]
pub struct RateEngine<'a> {
    tariff: &'a TariffVersion,
}

/// Base price before GST plus the figures that produced it
struct BasePrice {
    chargeable_weight: Decimal,
    minimum_weight_applied: bool,
    price_per_unit: Decimal,
    units: Decimal,
    additional_slab_rate: Option<Decimal>,
    additional_slabs: u32,
    base_price: Decimal,
}

impl<'a> RateEngine<'a> {
    pub fn new(tariff: &'a TariffVersion) -> Self {
        Self { tariff }
    }

    /// Price a shipment
    ///
    /// # Errors
    ///
    /// - `Validation` for a non-positive or absurd weight
    /// - `UnsupportedReverseRoute` when a reverse destination is neither
    ///   Assam nor North-East
    /// - `TariffConfigurationMissing` when a reached rate is absent
    #[instrument(skip(self, request), fields(tariff_version = self.tariff.id, service_type = %request.service_type))]
    pub fn price(&self, request: &RateRequest) -> AppResult<PriceBreakdown> {
        request.validate()?;
        if request.weight > MAX_WEIGHT {
            return Err(AppError::Validation(format!(
                "Weight {} exceeds the maximum of {}",
                request.weight, MAX_WEIGHT
            )));
        }

        if request.is_reverse() {
            return self.price_reverse(request);
        }

        let zone = ZoneClassifier::classify(request.to_pincode, request.by_air);
        let base = match (request.service_type, request.priority) {
            (ServiceType::Dox, false) => self.dox_base(request.weight, zone)?,
            (ServiceType::Dox, true) => self.priority_base(request.weight, zone)?,
            (ServiceType::NonDox, _) => {
                let rate = self.tariff.rates.non_dox_rate(request.by_air, zone)?;
                BasePrice {
                    chargeable_weight: request.weight,
                    minimum_weight_applied: false,
                    price_per_unit: rate,
                    units: request.weight,
                    additional_slab_rate: None,
                    additional_slabs: 0,
                    base_price: rate * request.weight,
                }
            }
        };

        debug!(zone = %zone, base_price = %base.base_price, "Forward price computed");
        Ok(self.breakdown(request, zone, None, base))
    }

    fn price_reverse(&self, request: &RateRequest) -> AppResult<PriceBreakdown> {
        let destination = request.to_pincode;
        let class = if ZoneClassifier::is_assam(destination) {
            DestinationClass::Assam
        } else if ZoneClassifier::is_north_east(destination) {
            DestinationClass::NorthEast
        } else {
            return Err(AppError::UnsupportedReverseRoute(destination.to_string()));
        };

        let mode = request.transport_mode.unwrap_or_default();
        let delivery = request.delivery_type.unwrap_or_default();
        let rates = &self.tariff.rates;

        let floor = rates.min_chargeable_weight(mode)?;
        let rate = rates.reverse_rate(class, mode, delivery)?;
        let chargeable = request.weight.max(floor);

        let base = BasePrice {
            chargeable_weight: chargeable,
            minimum_weight_applied: chargeable > request.weight,
            price_per_unit: rate,
            units: chargeable,
            additional_slab_rate: None,
            additional_slabs: 0,
            base_price: rate * chargeable,
        };

        let zone = ZoneClassifier::classify(destination, mode.is_air());
        debug!(
            class = %class,
            mode = %mode,
            delivery = %delivery,
            minimum_weight_applied = base.minimum_weight_applied,
            "Reverse price computed"
        );

        let mut breakdown = self.breakdown(request, zone, Some(class), base);
        breakdown.transport_mode = Some(mode);
        breakdown.delivery_type = Some(delivery);
        Ok(breakdown)
    }

    /// Non-priority DOX slabs, weight in grams
    fn dox_base(&self, grams: Decimal, zone: Zone) -> AppResult<BasePrice> {
        let rates = &self.tariff.rates;

        if grams <= DOX_FIRST_SLAB_GRAMS {
            let rate = rates.dox_rate(WeightSlab::UpTo250g, zone)?;
            return Ok(BasePrice::flat(grams, rate));
        }

        let rate = rates.dox_rate(WeightSlab::From251To500g, zone)?;
        if grams <= DOX_BASE_SLAB_GRAMS {
            return Ok(BasePrice::flat(grams, rate));
        }

        let additional = rates.dox_rate(WeightSlab::Additional500g, zone)?;
        BasePrice::with_additional_slabs(grams, rate, additional)
    }

    /// Priority DOX slabs, weight in grams
    fn priority_base(&self, grams: Decimal, zone: Zone) -> AppResult<BasePrice> {
        let rates = &self.tariff.rates;

        let rate = rates.priority_rate(WeightSlab::UpTo500g, zone)?;
        if grams <= DOX_BASE_SLAB_GRAMS {
            return Ok(BasePrice::flat(grams, rate));
        }

        let additional = rates.priority_rate(WeightSlab::Additional500g, zone)?;
        BasePrice::with_additional_slabs(grams, rate, additional)
    }

    fn breakdown(
        &self,
        request: &RateRequest,
        zone: Zone,
        destination_class: Option<DestinationClass>,
        base: BasePrice,
    ) -> PriceBreakdown {
        let gst_amount = PriceBreakdown::gst_for(base.base_price);

        PriceBreakdown {
            service_type: request.service_type,
            zone,
            destination_class,
            transport_mode: request.transport_mode,
            delivery_type: request.delivery_type,
            priority: request.priority,
            by_air: request.by_air,
            requested_weight: request.weight,
            chargeable_weight: base.chargeable_weight,
            minimum_weight_applied: base.minimum_weight_applied,
            price_per_unit: base.price_per_unit,
            units: base.units,
            additional_slab_rate: base.additional_slab_rate,
            additional_slabs: base.additional_slabs,
            base_price: base.base_price,
            gst_rate: GST_RATE,
            gst_amount,
            final_price: base.base_price + gst_amount,
            tariff_version: self.tariff.id,
        }
    }
}

impl BasePrice {
    fn flat(grams: Decimal, rate: Decimal) -> Self {
        Self {
            chargeable_weight: grams,
            minimum_weight_applied: false,
            price_per_unit: rate,
            units: Decimal::ONE,
            additional_slab_rate: None,
            additional_slabs: 0,
            base_price: rate,
        }
    }

    /// Base slab plus `ceil((grams - 500) / 500)` additional slabs
    fn with_additional_slabs(grams: Decimal, rate: Decimal, additional: Decimal) -> AppResult<Self> {
        let slabs = ((grams - DOX_BASE_SLAB_GRAMS) / DOX_ADDITIONAL_SLAB_GRAMS)
            .ceil()
            .to_u32()
            .ok_or_else(|| AppError::Validation(format!("Weight {} is out of range", grams)))?;

        Ok(Self {
            chargeable_weight: grams,
            minimum_weight_applied: false,
            price_per_unit: rate,
            units: Decimal::ONE,
            additional_slab_rate: Some(additional),
            additional_slabs: slabs,
            base_price: rate + Decimal::from(slabs) * additional,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use courier_core::models::{DeliveryType, Pincode, TariffTable, TransportMode};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn tariff() -> TariffVersion {
        let rates: TariffTable =
            serde_json::from_str(include_str!("../../../config/tariff.seed.json")).unwrap();
        TariffVersion {
            id: 3,
            ..TariffVersion::new(rates, Utc::now())
        }
    }

    fn pin(s: &str) -> Pincode {
        s.parse().unwrap()
    }

    fn dox(to: &str, grams: Decimal) -> RateRequest {
        RateRequest::forward(pin(to), grams, ServiceType::Dox)
    }

    fn reverse(from: &str, to: &str, kg: Decimal) -> RateRequest {
        RateRequest {
            from_pincode: Some(pin(from)),
            ..RateRequest::forward(pin(to), kg, ServiceType::NonDox)
        }
    }

    #[test]
    fn test_dox_first_slab_boundary() {
        let tariff = tariff();
        let engine = RateEngine::new(&tariff);

        let at_250 = engine.price(&dox("781001", dec!(250))).unwrap();
        assert_eq!(at_250.zone, Zone::Assam);
        assert_eq!(at_250.base_price, dec!(30));

        let at_251 = engine.price(&dox("781001", dec!(251))).unwrap();
        assert_eq!(at_251.base_price, dec!(45));
        assert_eq!(at_251.additional_slabs, 0);

        let at_500 = engine.price(&dox("781001", dec!(500))).unwrap();
        assert_eq!(at_500.base_price, dec!(45));
    }

    #[test]
    fn test_dox_additional_slabs() {
        let tariff = tariff();
        let engine = RateEngine::new(&tariff);

        // ceil(600 / 500) = 2
        let price = engine.price(&dox("781001", dec!(1100))).unwrap();
        assert_eq!(price.additional_slabs, 2);
        assert_eq!(price.additional_slab_rate, Some(dec!(25)));
        assert_eq!(price.base_price, dec!(45) + dec!(2) * dec!(25));

        let price = engine.price(&dox("781001", dec!(501))).unwrap();
        assert_eq!(price.additional_slabs, 1);

        let price = engine.price(&dox("781001", dec!(1000))).unwrap();
        assert_eq!(price.additional_slabs, 1);
    }

    #[test]
    fn test_priority_dox() {
        let tariff = tariff();
        let engine = RateEngine::new(&tariff);

        let mut request = dox("110001", dec!(400));
        request.priority = true;
        assert_eq!(engine.price(&request).unwrap().base_price, dec!(120));

        request.weight = dec!(1600);
        let price = engine.price(&request).unwrap();
        assert_eq!(price.additional_slabs, 3);
        assert_eq!(price.base_price, dec!(120) + dec!(3) * dec!(65));
    }

    #[test]
    fn test_forward_non_dox_has_no_floor() {
        let tariff = tariff();
        let engine = RateEngine::new(&tariff);

        let request = RateRequest::forward(pin("110001"), dec!(2.5), ServiceType::NonDox);
        let price = engine.price(&request).unwrap();
        assert_eq!(price.chargeable_weight, dec!(2.5));
        assert!(!price.minimum_weight_applied);
        assert_eq!(price.base_price, dec!(35) * dec!(2.5));

        let mut by_air = RateRequest::forward(pin("795001"), dec!(3), ServiceType::NonDox);
        by_air.by_air = true;
        let price = engine.price(&by_air).unwrap();
        assert_eq!(price.zone, Zone::NeByAirAgtImp);
        assert_eq!(price.base_price, dec!(270));
    }

    #[test]
    fn test_kolkata_uses_dedicated_rate_or_rest_of_india() {
        let tariff = tariff();
        let engine = RateEngine::new(&tariff);

        let price = engine.price(&dox("700001", dec!(100))).unwrap();
        assert_eq!(price.zone, Zone::Kolkata);
        assert_eq!(price.base_price, dec!(45));

        // The air table has no Kolkata column
        let mut request = RateRequest::forward(pin("700001"), dec!(1), ServiceType::NonDox);
        request.by_air = true;
        assert_eq!(engine.price(&request).unwrap().base_price, dec!(110));
    }

    #[test]
    fn test_reverse_minimum_weight() {
        let tariff = tariff();
        let engine = RateEngine::new(&tariff);

        let mut request = reverse("110001", "781001", dec!(50));
        request.transport_mode = Some(TransportMode::ByRoad);
        let price = engine.price(&request).unwrap();

        assert_eq!(price.destination_class, Some(DestinationClass::Assam));
        assert_eq!(price.chargeable_weight, dec!(500));
        assert!(price.minimum_weight_applied);
        assert_eq!(price.base_price, dec!(10) * dec!(500));
    }

    #[test]
    fn test_reverse_above_floor_and_defaults() {
        let tariff = tariff();
        let engine = RateEngine::new(&tariff);

        let price = engine.price(&reverse("110001", "793001", dec!(600))).unwrap();
        assert_eq!(price.destination_class, Some(DestinationClass::NorthEast));
        assert_eq!(price.transport_mode, Some(TransportMode::ByRoad));
        assert_eq!(price.delivery_type, Some(DeliveryType::NormalDelivery));
        assert!(!price.minimum_weight_applied);
        assert_eq!(price.base_price, dec!(13) * dec!(600));

        let mut request = reverse("110001", "781001", dec!(30));
        request.transport_mode = Some(TransportMode::ByFlight);
        request.delivery_type = Some(DeliveryType::PriorityDelivery);
        let price = engine.price(&request).unwrap();
        assert_eq!(price.chargeable_weight, dec!(30));
        assert_eq!(price.base_price, dec!(38) * dec!(30));
    }

    #[test]
    fn test_reverse_outside_north_east_rejected() {
        let tariff = tariff();
        let engine = RateEngine::new(&tariff);

        let result = engine.price(&reverse("781001", "110001", dec!(10)));
        assert!(matches!(result, Err(AppError::UnsupportedReverseRoute(_))));
    }

    #[test]
    fn test_missing_rate_fails_closed() {
        let mut tariff = tariff();
        tariff.rates.dox_pricing.up_to_250g.assam = None;
        let engine = RateEngine::new(&tariff);

        let result = engine.price(&dox("781001", dec!(100)));
        assert!(matches!(
            result,
            Err(AppError::TariffConfigurationMissing(_))
        ));
    }

    #[test]
    fn test_non_positive_weight_rejected() {
        let tariff = tariff();
        let engine = RateEngine::new(&tariff);
        assert!(matches!(
            engine.price(&dox("781001", Decimal::ZERO)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_breakdown_records_tariff_version() {
        let tariff = tariff();
        let price = RateEngine::new(&tariff)
            .price(&dox("110001", dec!(10)))
            .unwrap();
        assert_eq!(price.tariff_version, 3);
        assert_eq!(price.gst_rate, dec!(0.18));
    }

    fn arb_request() -> impl Strategy<Value = RateRequest> {
        (
            prop::sample::select(vec![
                "781001", "795001", "799010", "793001", "737101", "700001", "110001", "560001",
            ]),
            1u32..20_000,
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(|(to, weight, non_dox, by_air, priority)| {
                let service = if non_dox {
                    ServiceType::NonDox
                } else {
                    ServiceType::Dox
                };
                let mut request = RateRequest::forward(pin(to), Decimal::from(weight), service);
                request.by_air = by_air;
                request.priority = priority;
                request
            })
    }

    proptest! {
        #[test]
        fn prop_final_price_is_base_plus_gst(request in arb_request()) {
            let tariff = tariff();
            let price = RateEngine::new(&tariff).price(&request).unwrap();
            prop_assert_eq!(price.final_price, price.base_price * dec!(1.18));
            prop_assert!(price.base_price > Decimal::ZERO);
        }

        #[test]
        fn prop_pricing_is_deterministic(request in arb_request()) {
            let tariff = tariff();
            let engine = RateEngine::new(&tariff);
            prop_assert_eq!(engine.price(&request).unwrap(), engine.price(&request).unwrap());
        }

        #[test]
        fn prop_dox_price_never_decreases_with_weight(grams in 1u32..10_000) {
            let tariff = tariff();
            let engine = RateEngine::new(&tariff);
            let lighter = engine.price(&dox("799010", Decimal::from(grams))).unwrap();
            let heavier = engine.price(&dox("799010", Decimal::from(grams + 1))).unwrap();
            prop_assert!(heavier.base_price >= lighter.base_price);
        }
    }
}
