//! Booking orchestrator
//!
//! The only path that couples allocation and pricing. A booking is priced
//! first, so a shipment that cannot be priced never consumes a number. The
//! usage record, with the price embedded, and the booking are then written
//! together by the booking store, so a number is used only by a stored
//! booking.

use chrono::Utc;
use courier_core::{
    models::{
        Booking, BookingStatus, DeliveryType, EntityRef, PartyDetails, Pincode, PriceBreakdown,
        RateRequest, ServiceType, SettlementType, ShipmentDetails, TransportMode, UsageRecord,
    },
    traits::{BookingStore, RangeLedger, TariffRepository, UsageLedger},
    AppError, AppResult,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::allocation::AllocationService;
use crate::rating::RateEngine;
use crate::tariff::TariffService;

/// Booking form submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    #[serde(rename = "originData")]
    pub origin: PartyDetails,
    #[serde(rename = "destinationData")]
    pub destination: PartyDetails,
    #[serde(rename = "shipmentData")]
    pub shipment: ShipmentForm,
    #[serde(rename = "invoiceData", default)]
    pub invoice: serde_json::Value,
    #[serde(rename = "paymentData", default)]
    pub payment: serde_json::Value,
    #[serde(default)]
    pub settlement: SettlementType,
}

/// Shipment section of the booking form
///
/// The service type stays a string until the request is priced, so an
/// unknown value is reported as `InvalidServiceType` rather than as a
/// malformed body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentForm {
    pub service_type: String,
    /// Grams for DOX, kilograms for non-DOX
    pub weight: Decimal,
    #[serde(default)]
    pub by_air: bool,
    #[serde(default)]
    pub priority: bool,
    #[serde(default)]
    pub reverse: bool,
    #[serde(default)]
    pub transport_mode: Option<TransportMode>,
    #[serde(default)]
    pub delivery_type: Option<DeliveryType>,
    #[serde(default = "default_pieces")]
    pub pieces: u32,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_pieces() -> u32 {
    1
}

impl ShipmentForm {
    /// Shipment as stored on the booking
    pub fn into_details(self, service_type: ServiceType) -> ShipmentDetails {
        ShipmentDetails {
            service_type,
            weight: self.weight,
            by_air: self.by_air,
            priority: self.priority,
            reverse: self.reverse,
            transport_mode: self.transport_mode,
            delivery_type: self.delivery_type,
            pieces: self.pieces,
            description: self.description,
        }
    }
}

impl BookingRequest {
    /// Pricing input derived from the form
    ///
    /// The origin only takes part in pricing for reverse shipments.
    pub fn rate_request(&self) -> AppResult<RateRequest> {
        let service_type = ServiceType::parse(&self.shipment.service_type)?;
        let to_pincode = parse_pincode("destinationData.pincode", &self.destination.pincode)?;
        let from_pincode = if self.shipment.reverse {
            Some(parse_pincode("originData.pincode", &self.origin.pincode)?)
        } else {
            None
        };

        let request = RateRequest {
            from_pincode,
            to_pincode,
            weight: self.shipment.weight,
            service_type,
            by_air: self.shipment.by_air,
            priority: self.shipment.priority,
            transport_mode: self.shipment.transport_mode,
            delivery_type: self.shipment.delivery_type,
        };
        request.validate()?;
        Ok(request)
    }
}

fn parse_pincode(field: &str, value: &str) -> AppResult<Pincode> {
    if value.trim().is_empty() {
        return Err(AppError::MissingField(field.to_string()));
    }
    value.parse()
}

/// Outcome of a committed booking
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResult {
    pub booking: Booking,
    pub usage: UsageRecord,
}

impl BookingResult {
    pub fn consignment_number(&self) -> i64 {
        self.booking.consignment_number
    }

    pub fn price_breakdown(&self) -> &PriceBreakdown {
        &self.booking.price_breakdown
    }
}

/// Booking orchestrator
pub struct BookingOrchestrator<R, U, B, T>
where
    R: RangeLedger + ?Sized,
    U: UsageLedger + ?Sized + 'static,
    B: BookingStore + ?Sized,
    T: TariffRepository + ?Sized,
{
    allocation: Arc<AllocationService<R, U>>,
    tariffs: Arc<TariffService<T>>,
    bookings: Arc<B>,
}

impl<R, U, B, T> BookingOrchestrator<R, U, B, T>
where
    R: RangeLedger + ?Sized,
    U: UsageLedger + ?Sized + 'static,
    B: BookingStore + ?Sized,
    T: TariffRepository + ?Sized,
{
    /// Create a new booking orchestrator
    pub fn new(
        allocation: Arc<AllocationService<R, U>>,
        tariffs: Arc<TariffService<T>>,
        bookings: Arc<B>,
    ) -> Self {
        Self {
            allocation,
            tariffs,
            bookings,
        }
    }

    /// Price a shipment against the active tariff without allocating
    #[instrument(skip(self, request))]
    pub async fn quote(&self, request: &RateRequest) -> AppResult<PriceBreakdown> {
        let tariff = self.tariffs.active().await?;
        RateEngine::new(&tariff).price(request)
    }

    /// Price, reserve and persist one booking
    ///
    /// The usage record and the booking are written in one store
    /// transaction, retried on allocation conflicts. A failed or abandoned
    /// write leaves no used number behind.
    ///
    /// # Errors
    ///
    /// Validation and pricing errors are returned before any number is
    /// reserved. Allocation errors pass through unchanged. Any other store
    /// failure is reported as `PersistenceFailure`.
    #[instrument(skip(self, request), fields(entity = %entity))]
    pub async fn create_booking(
        &self,
        entity: &EntityRef,
        request: BookingRequest,
    ) -> AppResult<BookingResult> {
        let rate_request = request.rate_request()?;
        let price = self.quote(&rate_request).await?;

        let reference = Booking::new_reference();
        let draft = Booking {
            id: Uuid::new_v4(),
            booking_reference: reference.clone(),
            entity_type: entity.entity_type,
            entity_id: entity.entity_id.clone(),
            consignment_number: 0,
            usage_id: Uuid::nil(),
            origin: request.origin,
            destination: request.destination,
            shipment: request.shipment.into_details(rate_request.service_type),
            invoice: request.invoice,
            payment: request.payment,
            settlement: request.settlement,
            price_breakdown: price.clone(),
            status: BookingStatus::Booked,
            created_at: Utc::now(),
        };

        let (usage, saved) = self
            .allocation
            .allocate_with(entity, |number| {
                let bookings = self.bookings.clone();
                let usage =
                    UsageRecord::for_booking(entity, number, reference.clone(), price.clone());
                let booking = Booking {
                    consignment_number: number,
                    usage_id: usage.id,
                    ..draft.clone()
                };
                async move {
                    bookings
                        .persist(&usage, &booking)
                        .await
                        .map_err(|e| match e {
                            AppError::AllocationConflict(_) => e,
                            other => {
                                error!(
                                    consignment_number = number,
                                    "Failed to persist booking: {}", other
                                );
                                AppError::PersistenceFailure(format!(
                                    "Booking {} could not be stored",
                                    booking.booking_reference
                                ))
                            }
                        })
                }
            })
            .await?;

        info!(
            consignment_number = saved.consignment_number,
            reference = %saved.booking_reference,
            final_price = %saved.price_breakdown.final_price,
            "Booking created"
        );
        Ok(BookingResult {
            booking: saved,
            usage,
        })
    }

    /// Find a committed booking by reference
    #[instrument(skip(self))]
    pub async fn find_booking(&self, reference: &str) -> AppResult<Booking> {
        self.bookings
            .find_by_reference(reference)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", reference)))
    }
}
