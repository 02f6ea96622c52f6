//! Integration tests for the booking core HTTP API
//!
//! Handlers run against the in-memory ledgers; no database is needed.

use actix_web::{http::StatusCode, test, web, App};
use chrono::Utc;
use courier_api::{
    configure_api, json_config, query_config, SharedAllocation, SharedOrchestrator,
    SharedTariffs,
};
use courier_core::{
    config::AllocationConfig,
    models::{EntityRef, RangeAssignment},
    traits::{BookingStore, RangeLedger, TariffRepository, UsageLedger},
};
use courier_db::{MemoryBookingStore, MemoryRangeLedger, MemoryTariffRepository, MemoryUsageLedger};
use courier_services::{parse_tariff_table, AllocationService, BookingOrchestrator, TariffService};
use serde_json::{json, Value};
use std::sync::Arc;

const SEED: &str = include_str!("../../../config/tariff.seed.json");

struct Services {
    ranges: Arc<MemoryRangeLedger>,
    allocation: Arc<SharedAllocation>,
    tariffs: Arc<SharedTariffs>,
    orchestrator: Arc<SharedOrchestrator>,
}

async fn services(with_tariff: bool) -> Services {
    let ranges = Arc::new(MemoryRangeLedger::new());
    let usage = Arc::new(MemoryUsageLedger::new(ranges.clone()));
    let bookings: Arc<dyn BookingStore> = Arc::new(MemoryBookingStore::new(usage.clone()));
    let tariff_repo: Arc<dyn TariffRepository> = Arc::new(MemoryTariffRepository::new());

    let range_ledger: Arc<dyn RangeLedger> = ranges.clone();
    let usage_ledger: Arc<dyn UsageLedger> = usage;

    let allocation: Arc<SharedAllocation> = Arc::new(AllocationService::new(
        range_ledger,
        usage_ledger,
        AllocationConfig::default(),
    ));
    let tariffs: Arc<SharedTariffs> = Arc::new(TariffService::new(tariff_repo, None));
    if with_tariff {
        tariffs
            .install(parse_tariff_table(SEED).unwrap(), Utc::now())
            .await
            .unwrap();
    }
    let orchestrator: Arc<SharedOrchestrator> = Arc::new(BookingOrchestrator::new(
        allocation.clone(),
        tariffs.clone(),
        bookings,
    ));

    Services {
        ranges,
        allocation,
        tariffs,
        orchestrator,
    }
}

macro_rules! app {
    ($services:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::from($services.allocation.clone()))
                .app_data(web::Data::from($services.tariffs.clone()))
                .app_data(web::Data::from($services.orchestrator.clone()))
                .app_data(json_config())
                .app_data(query_config())
                .service(web::scope("/api/v1").configure(configure_api)),
        )
        .await
    };
}

fn booking_body(destination: &str) -> Value {
    json!({
        "originData": { "name": "Sender", "mobileNumber": "9000000001", "pincode": "110001" },
        "destinationData": { "name": "Receiver", "mobileNumber": "9000000002", "pincode": destination },
        "shipmentData": { "serviceType": "dox", "weight": 1100 },
        "invoiceData": {},
        "paymentData": {}
    })
}

#[actix_web::test]
async fn test_create_and_fetch_booking() {
    let services = services(true).await;
    let entity = EntityRef::corporate("corp-api");
    services
        .ranges
        .create(&RangeAssignment::new(&entity, 5000, 5009))
        .await
        .unwrap();
    let app = app!(services);

    let req = test::TestRequest::post()
        .uri("/api/v1/bookings")
        .insert_header(("X-Entity-Type", "corporate"))
        .insert_header(("X-Entity-Id", "corp-api"))
        .set_json(booking_body("795001"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["consignmentNumber"], 5000);
    // 251gm-500gm + 2 x add500gm at the North-East surface rate
    assert_eq!(body["data"]["priceBreakdown"]["basePrice"], "115");
    assert_eq!(body["data"]["priceBreakdown"]["zone"], "neBySurface");

    let reference = body["data"]["bookingReference"].as_str().unwrap().to_string();
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/bookings/{}", reference))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["consignmentNumber"], 5000);
}

#[actix_web::test]
async fn test_booking_requires_entity_headers() {
    let services = services(true).await;
    let app = app!(services);

    let req = test::TestRequest::post()
        .uri("/api/v1/bookings")
        .set_json(booking_body("781001"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "missing_field");
}

#[actix_web::test]
async fn test_booking_without_range_is_rejected() {
    let services = services(true).await;
    let app = app!(services);

    let req = test::TestRequest::post()
        .uri("/api/v1/bookings")
        .insert_header(("X-Entity-Type", "office"))
        .insert_header(("X-Entity-Id", "no-range"))
        .set_json(booking_body("781001"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "no_range_assigned");
}

#[actix_web::test]
async fn test_malformed_booking_body() {
    let services = services(true).await;
    let app = app!(services);

    let req = test::TestRequest::post()
        .uri("/api/v1/bookings")
        .insert_header(("X-Entity-Type", "office"))
        .insert_header(("X-Entity-Id", "o-1"))
        .set_json(json!({ "originData": {} }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_booking_with_unknown_service_type() {
    let services = services(true).await;
    let entity = EntityRef::office("o-2");
    services
        .ranges
        .create(&RangeAssignment::new(&entity, 1, 5))
        .await
        .unwrap();
    let app = app!(services);

    let mut body = booking_body("781001");
    body["shipmentData"]["serviceType"] = json!("freight");
    let req = test::TestRequest::post()
        .uri("/api/v1/bookings")
        .insert_header(("X-Entity-Type", "office"))
        .insert_header(("X-Entity-Id", "o-2"))
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid_service_type");

    let summary = services.allocation.summary(&entity).await.unwrap();
    assert_eq!(summary.used_count, 0);
}

#[actix_web::test]
async fn test_consignment_check_and_usage() {
    let services = services(true).await;
    let entity = EntityRef::office("GHY-01");
    services
        .ranges
        .create(&RangeAssignment::new(&entity, 1, 4))
        .await
        .unwrap();
    services.allocation.allocate(&entity).await.unwrap();
    let app = app!(services);

    let req = test::TestRequest::get()
        .uri("/api/v1/consignment/check")
        .insert_header(("X-Entity-Type", "office"))
        .insert_header(("X-Entity-Id", "GHY-01"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["hasAssignment"], true);
    assert_eq!(body["data"]["totalAssigned"], 4);
    assert_eq!(body["data"]["usedCount"], 1);
    assert_eq!(body["data"]["availableCount"], 3);

    let req = test::TestRequest::get()
        .uri("/api/v1/consignment/usage?page=1&per_page=10")
        .insert_header(("X-Entity-Type", "office"))
        .insert_header(("X-Entity-Id", "GHY-01"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["consignmentNumber"], 1);
}

#[actix_web::test]
async fn test_consignment_check_without_assignment() {
    let services = services(true).await;
    let app = app!(services);

    let req = test::TestRequest::get()
        .uri("/api/v1/consignment/check")
        .insert_header(("X-Entity-Type", "corporate"))
        .insert_header(("X-Entity-Id", "nobody"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["hasAssignment"], false);
    assert_eq!(body["data"]["availableCount"], 0);
}

#[actix_web::test]
async fn test_calculate_rate() {
    let services = services(true).await;
    let app = app!(services);

    let req = test::TestRequest::post()
        .uri("/api/v1/rates/calculate")
        .set_json(json!({
            "fromPincode": "110001",
            "toPincode": "781001",
            "weight": 50,
            "serviceType": "non-dox",
            "transportMode": "byRoad"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["minimumWeightApplied"], true);
    assert_eq!(body["data"]["chargeableWeight"], "500");
}

#[actix_web::test]
async fn test_calculate_rate_unsupported_reverse_route() {
    let services = services(true).await;
    let app = app!(services);

    let req = test::TestRequest::post()
        .uri("/api/v1/rates/calculate")
        .set_json(json!({
            "fromPincode": "781001",
            "toPincode": "560001",
            "weight": 5,
            "serviceType": "non-dox"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "unsupported_reverse_route");
}

#[actix_web::test]
async fn test_missing_tariff_is_server_error() {
    let services = services(false).await;
    let app = app!(services);

    let req = test::TestRequest::get()
        .uri("/api/v1/tariffs/active")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "tariff_configuration_missing");
}

#[actix_web::test]
async fn test_active_tariff() {
    let services = services(true).await;
    let app = app!(services);

    let req = test::TestRequest::get()
        .uri("/api/v1/tariffs/active")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["version"], 1);
    assert!(body["data"]["rates"]["doxPricing"].is_object());
}
