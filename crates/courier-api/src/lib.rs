//! API layer for the courier booking core
//!
//! HTTP handlers for bookings, consignment availability, rate quotes and
//! the active tariff. Services are shared behind trait objects so the same
//! handlers run against PostgreSQL in production and in-memory ledgers in
//! tests.

#![forbid(unsafe_code)]

pub mod dto;
pub mod extractors;
pub mod handlers;

use actix_web::{web, HttpResponse};
use courier_core::traits::{BookingStore, RangeLedger, TariffRepository, UsageLedger};
use courier_core::AppError;
use courier_services::{AllocationService, BookingOrchestrator, TariffService};

pub use dto::{ApiResponse, PaginationParams};
pub use extractors::EntityContext;
pub use handlers::{configure_bookings, configure_consignments, configure_rates, configure_tariffs};

/// Allocation service over any range and usage ledger
pub type SharedAllocation = AllocationService<dyn RangeLedger, dyn UsageLedger>;

/// Tariff service over any tariff repository
pub type SharedTariffs = TariffService<dyn TariffRepository>;

/// Booking orchestrator over any ledgers and stores
pub type SharedOrchestrator =
    BookingOrchestrator<dyn RangeLedger, dyn UsageLedger, dyn BookingStore, dyn TariffRepository>;

/// Register every booking core route on `cfg`
///
/// Mounted under `/api/v1` by the server binary.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.configure(configure_bookings)
        .configure(configure_consignments)
        .configure(configure_rates)
        .configure(configure_tariffs);
}

/// JSON body config reporting malformed payloads as validation errors
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(256 * 1024)
        .error_handler(|err, _req| {
            let message = err.to_string();
            actix_web::error::InternalError::from_response(
                err,
                HttpResponse::BadRequest().json(serde_json::json!({
                    "error": AppError::Validation(String::new()).error_code(),
                    "message": message,
                    "status": 400,
                })),
            )
            .into()
        })
}

/// Query string config reporting malformed parameters as validation errors
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        actix_web::error::InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(serde_json::json!({
                "error": "invalid_query",
                "message": message,
                "status": 400,
            })),
        )
        .into()
    })
}
