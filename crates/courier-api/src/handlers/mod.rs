//! HTTP request handlers

pub mod booking;
pub mod consignment;
pub mod rate;
pub mod tariff;

pub use booking::configure as configure_bookings;
pub use consignment::configure as configure_consignments;
pub use rate::configure as configure_rates;
pub use tariff::configure as configure_tariffs;
