//! In-memory ledgers
//!
//! Same contracts as the PostgreSQL repositories, held behind
//! `parking_lot` mutexes. The usage ledger checks range membership and
//! uniqueness under one lock so it stays atomic against range revocation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_core::{
    models::{Booking, EntityRef, RangeAssignment, TariffVersion, UsageRecord},
    traits::{BookingStore, RangeLedger, TariffRepository, UsageLedger},
    AppError, AppResult,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

#[derive(Default)]
struct RangeState {
    next_id: i64,
    ranges: Vec<RangeAssignment>,
}

/// Range ledger held in process memory
#[derive(Default)]
pub struct MemoryRangeLedger {
    state: Mutex<RangeState>,
}

impl MemoryRangeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn covers(&self, entity: &EntityRef, number: i64) -> bool {
        self.state.lock().ranges.iter().any(|r| {
            r.is_active
                && r.entity_type == entity.entity_type
                && r.entity_id == entity.entity_id
                && r.contains(number)
        })
    }
}

#[async_trait]
impl RangeLedger for MemoryRangeLedger {
    #[instrument(skip(self, range), fields(entity = %range.entity()))]
    async fn create(&self, range: &RangeAssignment) -> AppResult<RangeAssignment> {
        if !range.is_well_formed() {
            return Err(AppError::Validation(format!(
                "Invalid range {}-{}",
                range.start_number, range.end_number
            )));
        }

        let mut state = self.state.lock();
        let overlapping = state.ranges.iter().any(|r| {
            r.is_active
                && r.entity_type == range.entity_type
                && r.entity_id == range.entity_id
                && r.overlaps(range)
        });
        if overlapping {
            return Err(AppError::Conflict(format!(
                "Range {}-{} overlaps an active range of {}",
                range.start_number,
                range.end_number,
                range.entity()
            )));
        }

        state.next_id += 1;
        let created = RangeAssignment {
            id: state.next_id,
            ..range.clone()
        };
        state.ranges.push(created.clone());

        info!(
            id = created.id,
            "Granted range {}-{}", created.start_number, created.end_number
        );
        Ok(created)
    }

    async fn find_active_by_entity(&self, entity: &EntityRef) -> AppResult<Vec<RangeAssignment>> {
        let mut ranges: Vec<RangeAssignment> = self
            .state
            .lock()
            .ranges
            .iter()
            .filter(|r| {
                r.is_active && r.entity_type == entity.entity_type && r.entity_id == entity.entity_id
            })
            .cloned()
            .collect();
        ranges.sort_by_key(|r| r.start_number);
        Ok(ranges)
    }

    async fn set_active(&self, id: i64, is_active: bool) -> AppResult<RangeAssignment> {
        let mut state = self.state.lock();
        let range = state
            .ranges
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Range {} not found", id)))?;
        range.is_active = is_active;
        Ok(range.clone())
    }
}

#[derive(Default)]
struct UsageState {
    by_entity: HashMap<EntityRef, BTreeMap<i64, UsageRecord>>,
    /// Reservations that a committed booking references
    committed: HashSet<Uuid>,
}

/// Usage ledger held in process memory
pub struct MemoryUsageLedger {
    ranges: Arc<MemoryRangeLedger>,
    state: Mutex<UsageState>,
}

impl MemoryUsageLedger {
    /// Usage ledger that validates membership against `ranges`
    pub fn new(ranges: Arc<MemoryRangeLedger>) -> Self {
        Self {
            ranges,
            state: Mutex::new(UsageState::default()),
        }
    }

    /// Range membership and uniqueness are checked under one lock
    fn insert(&self, record: &UsageRecord) -> AppResult<UsageRecord> {
        let entity = record.entity();
        let mut state = self.state.lock();

        if !self.ranges.covers(&entity, record.consignment_number) {
            debug!("Number is outside the entity's active ranges");
            return Err(AppError::AllocationConflict(format!(
                "Consignment number {} is no longer available to {}",
                record.consignment_number, entity
            )));
        }

        let used = state.by_entity.entry(entity).or_default();
        if used.contains_key(&record.consignment_number) {
            debug!("Number already reserved");
            return Err(AppError::AllocationConflict(format!(
                "Consignment number {} is no longer available to {}",
                record.consignment_number,
                record.entity()
            )));
        }

        used.insert(record.consignment_number, record.clone());
        Ok(record.clone())
    }

    fn mark_committed(&self, id: Uuid) {
        self.state.lock().committed.insert(id);
    }

    /// Total reservations across all entities
    pub fn len(&self) -> usize {
        self.state.lock().by_entity.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UsageLedger for MemoryUsageLedger {
    #[instrument(skip(self, record), fields(entity = %record.entity(), consignment_number = record.consignment_number))]
    async fn reserve(&self, record: &UsageRecord) -> AppResult<UsageRecord> {
        self.insert(record)
    }

    async fn release(&self, id: Uuid) -> AppResult<bool> {
        let mut state = self.state.lock();
        if state.committed.contains(&id) {
            return Ok(false);
        }

        for used in state.by_entity.values_mut() {
            let number = used
                .iter()
                .find(|(_, record)| record.id == id)
                .map(|(number, _)| *number);
            if let Some(number) = number {
                used.remove(&number);
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn used_numbers(&self, entity: &EntityRef) -> AppResult<Vec<i64>> {
        Ok(self
            .state
            .lock()
            .by_entity
            .get(entity)
            .map(|used| used.keys().copied().collect())
            .unwrap_or_default())
    }

    async fn find_by_number(
        &self,
        entity: &EntityRef,
        consignment_number: i64,
    ) -> AppResult<Option<UsageRecord>> {
        Ok(self
            .state
            .lock()
            .by_entity
            .get(entity)
            .and_then(|used| used.get(&consignment_number))
            .cloned())
    }

    async fn list_by_entity(
        &self,
        entity: &EntityRef,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<UsageRecord>, i64)> {
        let state = self.state.lock();
        let mut records: Vec<UsageRecord> = state
            .by_entity
            .get(entity)
            .map(|used| used.values().cloned().collect())
            .unwrap_or_default();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = records.len() as i64;
        let page = records
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }
}

/// Booking store held in process memory
///
/// Records the usage together with the booking and marks it committed so
/// the usage ledger refuses to release it, matching the foreign key of the
/// PostgreSQL schema.
pub struct MemoryBookingStore {
    usage: Arc<MemoryUsageLedger>,
    bookings: Mutex<HashMap<String, Booking>>,
}

impl MemoryBookingStore {
    pub fn new(usage: Arc<MemoryUsageLedger>) -> Self {
        Self {
            usage,
            bookings: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.bookings.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    #[instrument(skip(self, usage, booking), fields(reference = %booking.booking_reference))]
    async fn persist(
        &self,
        usage: &UsageRecord,
        booking: &Booking,
    ) -> AppResult<(UsageRecord, Booking)> {
        if booking.usage_id != usage.id || booking.consignment_number != usage.consignment_number {
            return Err(AppError::Database(format!(
                "Booking {} does not match usage {}",
                booking.booking_reference, usage.id
            )));
        }

        // Both writes happen under the bookings lock with no await between
        let mut bookings = self.bookings.lock();
        if bookings.contains_key(&booking.booking_reference) {
            return Err(AppError::Conflict(format!(
                "Booking {} already exists",
                booking.booking_reference
            )));
        }

        let usage = self.usage.insert(usage)?;
        bookings.insert(booking.booking_reference.clone(), booking.clone());
        self.usage.mark_committed(usage.id);
        Ok((usage, booking.clone()))
    }

    async fn find_by_reference(&self, reference: &str) -> AppResult<Option<Booking>> {
        Ok(self.bookings.lock().get(reference).cloned())
    }
}

/// Tariff repository held in process memory
#[derive(Default)]
pub struct MemoryTariffRepository {
    versions: Mutex<Vec<TariffVersion>>,
}

impl MemoryTariffRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TariffRepository for MemoryTariffRepository {
    async fn find_active(&self, at: DateTime<Utc>) -> AppResult<Option<TariffVersion>> {
        Ok(self
            .versions
            .lock()
            .iter()
            .filter(|v| v.effective_from <= at)
            .max_by_key(|v| (v.effective_from, v.id))
            .cloned())
    }

    async fn next_effective_from(
        &self,
        after: DateTime<Utc>,
    ) -> AppResult<Option<DateTime<Utc>>> {
        Ok(self
            .versions
            .lock()
            .iter()
            .map(|v| v.effective_from)
            .filter(|from| *from > after)
            .min())
    }

    async fn create(&self, version: &TariffVersion) -> AppResult<TariffVersion> {
        version.rates.validate()?;

        let mut versions = self.versions.lock();
        let created = TariffVersion {
            id: versions.len() as i64 + 1,
            ..version.clone()
        };
        versions.push(created.clone());
        Ok(created)
    }
}
