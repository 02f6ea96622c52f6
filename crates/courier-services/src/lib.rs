//! Booking core services
//!
//! The services that turn ledgers and tariffs into bookings:
//!
//! - `RateEngine` - pure pricing of one shipment against one tariff version
//! - `TariffService` - active tariff lookup with Redis caching and seeding
//! - `AllocationService` - lowest-free-number allocation with bounded retry
//! - `BookingOrchestrator` - price, reserve and persist as one unit
//!
//! Services own their dependencies behind `Arc` and are generic over the
//! ledger traits, so the same code runs against PostgreSQL or the
//! in-memory ledgers.

pub mod allocation;
pub mod booking;
pub mod rating;
pub mod tariff;

pub use allocation::{next_free_number, AllocationService, ReservationGuard};
pub use booking::{BookingOrchestrator, BookingRequest, BookingResult, ShipmentForm};
pub use rating::RateEngine;
pub use tariff::{parse_tariff_table, TariffService};

/// Business logic constants
pub mod constants {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    /// Upper bound of the first DOX slab in grams
    pub const DOX_FIRST_SLAB_GRAMS: Decimal = dec!(250);

    /// Upper bound of the base DOX and priority slab in grams
    pub const DOX_BASE_SLAB_GRAMS: Decimal = dec!(500);

    /// Size of each additional DOX slab in grams
    pub const DOX_ADDITIONAL_SLAB_GRAMS: Decimal = dec!(500);

    /// Largest weight the engine accepts, in the request's unit
    pub const MAX_WEIGHT: Decimal = dec!(10000000);
}
