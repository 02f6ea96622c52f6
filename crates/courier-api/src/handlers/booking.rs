//! Booking handlers

use crate::dto::{ApiResponse, BookingResponse};
use crate::extractors::EntityContext;
use crate::SharedOrchestrator;
use actix_web::{web, HttpResponse};
use courier_core::AppError;
use courier_services::BookingRequest;
use tracing::{debug, info, instrument};

/// Book a shipment: price it, allocate a consignment number, persist
///
/// POST /api/v1/bookings
#[instrument(skip(orchestrator, req), fields(entity = %*entity))]
pub async fn create_booking(
    orchestrator: web::Data<SharedOrchestrator>,
    entity: EntityContext,
    req: web::Json<BookingRequest>,
) -> Result<HttpResponse, AppError> {
    debug!(
        service_type = %req.shipment.service_type,
        weight = %req.shipment.weight,
        "Booking requested"
    );

    let result = orchestrator
        .create_booking(&entity, req.into_inner())
        .await?;

    info!(
        consignment_number = result.consignment_number(),
        reference = %result.booking.booking_reference,
        "Booking committed"
    );

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        BookingResponse::from(result),
        "Booking created",
    )))
}

/// Get a booking by reference
///
/// GET /api/v1/bookings/{reference}
#[instrument(skip(orchestrator))]
pub async fn get_booking(
    orchestrator: web::Data<SharedOrchestrator>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let reference = path.into_inner();
    let booking = orchestrator.find_booking(&reference).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(booking)))
}

/// Configure booking routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/bookings")
            .route("", web::post().to(create_booking))
            .route("/{reference}", web::get().to(get_booking)),
    );
}
