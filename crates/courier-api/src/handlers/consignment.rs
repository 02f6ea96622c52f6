//! Consignment availability handlers
//!
//! Figures here are advisory. They may be stale by the time the caller
//! reads them; only a booking reserves a number.

use crate::dto::{ApiResponse, ConsignmentCheckResponse, PaginationParams, UsageRecordResponse};
use crate::extractors::EntityContext;
use crate::SharedAllocation;
use actix_web::{web, HttpResponse};
use courier_core::AppError;
use tracing::{debug, instrument, warn};
use validator::Validate;

/// Capacity of the calling entity's active ranges
///
/// GET /api/v1/consignment/check
#[instrument(skip(allocation), fields(entity = %*entity))]
pub async fn check_availability(
    allocation: web::Data<SharedAllocation>,
    entity: EntityContext,
) -> Result<HttpResponse, AppError> {
    let summary = allocation.summary(&entity).await?;

    debug!(
        total = summary.total_assigned,
        used = summary.used_count,
        available = summary.available_count,
        "Consignment availability"
    );

    Ok(HttpResponse::Ok().json(ApiResponse::success(ConsignmentCheckResponse::new(
        &entity, summary,
    ))))
}

/// Used consignment numbers of the calling entity, newest first
///
/// GET /api/v1/consignment/usage
#[instrument(skip(allocation, query), fields(entity = %*entity))]
pub async fn list_usage(
    allocation: web::Data<SharedAllocation>,
    entity: EntityContext,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    query.validate().map_err(|e| {
        warn!("Pagination validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let (records, total) = allocation
        .usage_history(&entity, &query.to_pagination())
        .await?;
    let data: Vec<UsageRecordResponse> = records.into_iter().map(Into::into).collect();

    Ok(HttpResponse::Ok().json(query.paginate(data, total)))
}

/// Configure consignment routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/consignment")
            .route("/check", web::get().to(check_availability))
            .route("/usage", web::get().to(list_usage)),
    );
}
