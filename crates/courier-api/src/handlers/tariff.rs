//! Tariff handlers

use crate::dto::{ApiResponse, TariffResponse};
use crate::SharedTariffs;
use actix_web::{web, HttpResponse};
use courier_core::AppError;
use tracing::instrument;

/// Tariff version currently in effect
///
/// GET /api/v1/tariffs/active
#[instrument(skip(tariffs))]
pub async fn get_active_tariff(
    tariffs: web::Data<SharedTariffs>,
) -> Result<HttpResponse, AppError> {
    let tariff = tariffs.active().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(TariffResponse::from(tariff))))
}

/// Configure tariff routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/tariffs").route("/active", web::get().to(get_active_tariff)));
}
