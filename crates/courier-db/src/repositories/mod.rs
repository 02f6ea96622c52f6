//! Repository implementations
//!
//! Concrete PostgreSQL implementations of the ledger and store traits
//! defined in courier-core.

pub mod booking_repo;
pub mod range_repo;
pub mod tariff_repo;
pub mod usage_repo;

pub use booking_repo::PgBookingStore;
pub use range_repo::PgRangeLedger;
pub use tariff_repo::PgTariffRepository;
pub use usage_repo::PgUsageLedger;
