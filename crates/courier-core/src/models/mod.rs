//! Domain models for the booking core

pub mod booking;
pub mod entity;
pub mod pricing;
pub mod range;
pub mod tariff;
pub mod usage;
pub mod zone;

pub use booking::{Booking, BookingStatus, PartyDetails, SettlementType, ShipmentDetails};
pub use entity::{EntityRef, EntityType};
pub use pricing::{DeliveryType, PriceBreakdown, RateRequest, ServiceType, TransportMode, GST_RATE};
pub use range::{AllocationSummary, RangeAssignment};
pub use tariff::{
    DestinationClass, DoxPricing, MinChargeableWeight, PriorityPricing, ReversePricing,
    TariffTable, TariffVersion, WeightSlab, ZoneRates,
};
pub use usage::UsageRecord;
pub use zone::{Pincode, Zone, ZoneClassifier};
