//! Booking DTOs

use chrono::{DateTime, Utc};
use courier_core::models::{BookingStatus, PriceBreakdown, SettlementType};
use courier_services::BookingResult;
use serde::Serialize;

/// Response to a committed booking
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub consignment_number: i64,
    pub booking_reference: String,
    pub price_breakdown: PriceBreakdown,
    pub settlement: SettlementType,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl From<BookingResult> for BookingResponse {
    fn from(result: BookingResult) -> Self {
        let booking = result.booking;
        Self {
            consignment_number: booking.consignment_number,
            booking_reference: booking.booking_reference,
            price_breakdown: booking.price_breakdown,
            settlement: booking.settlement,
            status: booking.status,
            created_at: booking.created_at,
        }
    }
}
