//! Courier Booking Database Layer
//!
//! PostgreSQL access and ledger implementations for the booking core:
//!
//! - Connection pool management and embedded migrations with sqlx
//! - Range, usage, booking and tariff repositories
//! - Usage inserts guarded by the per-entity unique index, so concurrent
//!   allocators on any number of instances never share a number
//! - In-memory ledgers with the same guarantees for tests and local runs

pub mod memory;
pub mod pool;
pub mod repositories;

pub use memory::{MemoryBookingStore, MemoryRangeLedger, MemoryTariffRepository, MemoryUsageLedger};
pub use pool::{create_pool, run_migrations};
pub use repositories::*;

// Re-export commonly used types
pub use courier_core::{AppError, AppResult};
pub use sqlx::{PgPool, Postgres, Transaction};
