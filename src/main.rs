//! Courier Booking Core server
//!
//! Consignment allocation, shipment pricing and booking over HTTP.

use actix_cors::Cors;
use actix_web::{http::header, middleware, web, App, HttpResponse, HttpServer};
use anyhow::Context;
use courier_api::{
    configure_api, json_config, query_config, SharedAllocation, SharedOrchestrator, SharedTariffs,
};
use courier_cache::RedisCache;
use courier_core::traits::{BookingStore, RangeLedger, TariffRepository, UsageLedger};
use courier_core::AppConfig;
use courier_db::{
    create_pool, run_migrations, PgBookingStore, PgRangeLedger, PgTariffRepository, PgUsageLedger,
};
use courier_services::{AllocationService, BookingOrchestrator, TariffService};
use std::env;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Health check endpoint
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "courier-booking",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Configure API routes
fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health_check))
            .configure(configure_api),
    );
}

/// Initialize tracing/logging
fn init_tracing() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "courier_booking={lvl},courier_api={lvl},courier_services={lvl},courier_db={lvl},courier_cache={lvl},actix_web=info,sqlx=warn",
            lvl = log_level
        ))
    });

    let json = env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        registry.with(fmt::layer().json().with_current_span(true)).init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    info!(
        "Starting Courier Booking Core v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = AppConfig::load().context("Failed to load configuration")?;

    info!("Connecting to database...");
    let pool = create_pool(&config.database)
        .await
        .context("Failed to create database pool")?;
    if config.database.run_migrations {
        run_migrations(&pool)
            .await
            .context("Failed to apply migrations")?;
    }

    // The cache only speeds up tariff lookups; run without it if Redis is down
    let cache = match RedisCache::new(&config.redis.url).await {
        Ok(cache) => Some(Arc::new(cache)),
        Err(e) => {
            warn!("Redis unavailable, tariff caching disabled: {}", e);
            None
        }
    };

    let ranges: Arc<dyn RangeLedger> = Arc::new(PgRangeLedger::new(pool.clone()));
    let usage: Arc<dyn UsageLedger> = Arc::new(PgUsageLedger::new(pool.clone()));
    let bookings: Arc<dyn BookingStore> = Arc::new(PgBookingStore::new(pool.clone()));
    let tariff_repo: Arc<dyn TariffRepository> = Arc::new(PgTariffRepository::new(pool.clone()));

    let tariffs: Arc<SharedTariffs> = Arc::new(
        TariffService::new(tariff_repo, cache).with_cache_ttl(config.tariff.cache_ttl_secs),
    );
    if let Some(seed) = &config.tariff.seed_file {
        match tariffs.seed_from_file(seed).await {
            Ok(Some(version)) => info!(id = version.id, "Seeded tariff from {}", seed),
            Ok(None) => {}
            Err(e) => warn!("Tariff seed {} not installed: {}", seed, e),
        }
    }

    let allocation: Arc<SharedAllocation> = Arc::new(AllocationService::new(
        ranges,
        usage,
        config.allocation.clone(),
    ));
    let orchestrator: Arc<SharedOrchestrator> = Arc::new(BookingOrchestrator::new(
        allocation.clone(),
        tariffs.clone(),
        bookings,
    ));

    let cors_origins = env::var("CORS_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string());

    let bind_addr = config.server_addr();
    info!(
        "Starting HTTP server on {} with {} workers",
        bind_addr, config.server.workers
    );

    HttpServer::new(move || {
        let origins = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _req_head| {
                origin
                    .to_str()
                    .map(|o| origins.split(',').any(|allowed| allowed.trim() == o))
                    .unwrap_or(false)
            })
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::ACCEPT,
                header::CONTENT_TYPE,
                header::HeaderName::from_static("x-entity-type"),
                header::HeaderName::from_static("x-entity-id"),
            ])
            .max_age(3600);

        App::new()
            .app_data(web::Data::from(allocation.clone()))
            .app_data(web::Data::from(tariffs.clone()))
            .app_data(web::Data::from(orchestrator.clone()))
            .app_data(json_config())
            .app_data(query_config())
            .wrap(cors)
            .wrap(TracingLogger::default())
            .wrap(middleware::Compress::default())
            .wrap(middleware::NormalizePath::trim())
            .configure(configure_routes)
    })
    .workers(config.server.workers)
    .bind(&bind_addr)?
    .run()
    .await?;

    Ok(())
}
