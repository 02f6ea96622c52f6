//! Rate quote handlers

use crate::dto::{ApiResponse, RateCalculateRequest};
use crate::SharedOrchestrator;
use actix_web::{web, HttpResponse};
use courier_core::AppError;
use tracing::{debug, instrument, warn};
use validator::Validate;

/// Price a shipment without booking it
///
/// POST /api/v1/rates/calculate
#[instrument(skip(orchestrator, req))]
pub async fn calculate_rate(
    orchestrator: web::Data<SharedOrchestrator>,
    req: web::Json<RateCalculateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Rate request validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let request = req.to_rate_request()?;
    let breakdown = orchestrator.quote(&request).await?;

    debug!(
        zone = %breakdown.zone,
        final_price = %breakdown.final_price,
        "Rate calculated"
    );

    Ok(HttpResponse::Ok().json(ApiResponse::success(breakdown)))
}

/// Configure rate routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/rates").route("/calculate", web::post().to(calculate_rate)));
}
