//! Courier Booking Core Library
//!
//! Foundational types, traits, and error handling for the booking core:
//!
//! - Domain models (range assignments, usage records, zones, tariffs,
//!   price breakdowns, bookings)
//! - Ledger traits implemented by the database layer
//! - Unified error handling with HTTP response mapping
//! - Application configuration

pub mod config;
pub mod error;
pub mod models;
pub mod traits;

pub use config::AppConfig;
pub use error::AppError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
