//! Consignment number allocation
//!
//! Finds the lowest unused number across an entity's active ranges and
//! reserves it through the usage ledger. The ledger's uniqueness rule is the
//! only synchronization: a reservation that loses a race comes back as
//! `AllocationConflict` and is retried against fresh ledger state with
//! jittered exponential backoff, a bounded number of times. This stays
//! correct with any number of service instances sharing one database.

use courier_core::{
    config::AllocationConfig,
    models::{AllocationSummary, EntityRef, RangeAssignment, UsageRecord},
    traits::{Pagination, RangeLedger, UsageLedger},
    AppError, AppResult,
};
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Lowest number inside `ranges` that is not in `used`
///
/// Ranges are walked in `start_number` order, so allocation is monotonic
/// within a range and continues into the next range once one is full.
/// Inactive ranges are skipped.
pub fn next_free_number(ranges: &[RangeAssignment], used: &[i64]) -> Option<i64> {
    let mut used = used.to_vec();
    used.sort_unstable();
    used.dedup();

    let mut active: Vec<&RangeAssignment> = ranges.iter().filter(|r| r.is_active).collect();
    active.sort_by_key(|r| r.start_number);

    for range in active {
        let mut candidate = range.start_number;
        let mut idx = used.partition_point(|&n| n < candidate);

        while idx < used.len() && used[idx] == candidate {
            candidate += 1;
            idx += 1;
        }

        if candidate <= range.end_number {
            return Some(candidate);
        }
    }

    None
}

/// Allocation service
///
/// Generic over the ledgers, sized or `dyn`, so the same allocator runs
/// against PostgreSQL and the in-memory ledgers.
pub struct AllocationService<R: RangeLedger + ?Sized, U: UsageLedger + ?Sized> {
    ranges: Arc<R>,
    usage: Arc<U>,
    config: AllocationConfig,
}

impl<R: RangeLedger + ?Sized, U: UsageLedger + ?Sized + 'static> AllocationService<R, U> {
    /// Create a new allocation service
    pub fn new(ranges: Arc<R>, usage: Arc<U>, config: AllocationConfig) -> Self {
        Self {
            ranges,
            usage,
            config,
        }
    }

    /// Reserve the lowest free number for `entity` as a bare placeholder
    ///
    /// # Errors
    ///
    /// - `NoRangeAssigned` when the entity has no active range
    /// - `RangeExhausted` when every number of every active range is used
    /// - `AllocationConflict` when every attempt lost a race
    #[instrument(skip(self), fields(entity = %entity))]
    pub async fn allocate(&self, entity: &EntityRef) -> AppResult<UsageRecord> {
        let guard = self
            .reserve_with(entity, |number| UsageRecord::placeholder(entity, number))
            .await?;
        Ok(guard.commit())
    }

    /// Reserve the lowest free number with a record built by `build`
    ///
    /// The returned guard releases the reservation when dropped uncommitted.
    #[instrument(skip(self, build), fields(entity = %entity))]
    pub async fn reserve_with<F>(
        &self,
        entity: &EntityRef,
        build: F,
    ) -> AppResult<ReservationGuard<U>>
    where
        F: Fn(i64) -> UsageRecord + Send + Sync,
    {
        let record = self
            .allocate_with(entity, |number| {
                let usage = self.usage.clone();
                let record = build(number);
                async move { usage.reserve(&record).await }
            })
            .await?;
        Ok(ReservationGuard::new(self.usage.clone(), record))
    }

    /// Run `insert` with the lowest free number until it stops conflicting
    ///
    /// `insert` must write the usage row itself and fail with
    /// `AllocationConflict` when the number was taken. That lets a caller
    /// write the usage row and its dependents in one transaction.
    ///
    /// # Errors
    ///
    /// - `NoRangeAssigned` when the entity has no active range
    /// - `RangeExhausted` when every number of every active range is used
    /// - `AllocationConflict` when all `max_attempts` attempts conflicted
    /// - any other error of `insert`, unchanged and not retried
    #[instrument(skip(self, insert), fields(entity = %entity))]
    pub async fn allocate_with<F, Fut, T>(&self, entity: &EntityRef, insert: F) -> AppResult<T>
    where
        F: Fn(i64) -> Fut + Send + Sync,
        Fut: Future<Output = AppResult<T>> + Send,
        T: Send,
    {
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let ranges = self.ranges.find_active_by_entity(entity).await?;
            if ranges.is_empty() {
                warn!("No active range assigned");
                return Err(AppError::NoRangeAssigned(entity.to_string()));
            }

            let used = self.usage.used_numbers(entity).await?;
            let number = next_free_number(&ranges, &used).ok_or_else(|| {
                warn!("Consignment ranges exhausted");
                AppError::RangeExhausted(entity.to_string())
            })?;

            match insert(number).await {
                Ok(inserted) => {
                    info!(
                        consignment_number = number,
                        attempt, "Consignment number reserved"
                    );
                    return Ok(inserted);
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.jittered_backoff(attempt);
                    debug!(
                        consignment_number = number,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Allocation conflict, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if e.is_retryable() {
                        error!(attempt, "Allocation conflict persisted, giving up");
                    }
                    return Err(e);
                }
            }
        }

        Err(AppError::AllocationConflict(format!(
            "No consignment number could be reserved for {}",
            entity
        )))
    }

    /// Compensating release of a reservation whose booking never committed
    #[instrument(skip(self))]
    pub async fn release(&self, usage_id: Uuid) -> AppResult<bool> {
        self.usage.release(usage_id).await
    }

    /// Advisory capacity of an entity; stale as soon as it is returned
    #[instrument(skip(self), fields(entity = %entity))]
    pub async fn summary(&self, entity: &EntityRef) -> AppResult<AllocationSummary> {
        let ranges = self.ranges.find_active_by_entity(entity).await?;
        let used = self.usage.used_numbers(entity).await?;
        Ok(AllocationSummary::from_ranges(&ranges, used))
    }

    /// Usage records of an entity, newest first, with the total count
    #[instrument(skip(self, pagination), fields(entity = %entity, page = pagination.page))]
    pub async fn usage_history(
        &self,
        entity: &EntityRef,
        pagination: &Pagination,
    ) -> AppResult<(Vec<UsageRecord>, i64)> {
        self.usage
            .list_by_entity(entity, pagination.limit(), pagination.offset())
            .await
    }

    /// Backoff for `attempt` scaled into its upper half at random
    fn jittered_backoff(&self, attempt: u32) -> Duration {
        let ceiling = self.config.backoff(attempt);
        let millis = ceiling.as_millis() as u64;
        if millis == 0 {
            return ceiling;
        }
        Duration::from_millis(rand::thread_rng().gen_range(millis / 2..=millis))
    }
}

/// A reserved consignment number pending its booking
///
/// Dropping the guard without [`commit`](Self::commit) releases the
/// reservation in the background, so an abandoned booking never leaves a
/// phantom used number.
pub struct ReservationGuard<U: UsageLedger + ?Sized + 'static> {
    usage: Arc<U>,
    record: UsageRecord,
    settled: bool,
}

impl<U: UsageLedger + ?Sized + 'static> ReservationGuard<U> {
    fn new(usage: Arc<U>, record: UsageRecord) -> Self {
        Self {
            usage,
            record,
            settled: false,
        }
    }

    /// The reserved usage record
    pub fn record(&self) -> &UsageRecord {
        &self.record
    }

    /// Keep the reservation
    pub fn commit(mut self) -> UsageRecord {
        self.settled = true;
        self.record.clone()
    }

    /// Release the reservation now
    pub async fn release(mut self) -> AppResult<bool> {
        self.settled = true;
        self.usage.release(self.record.id).await
    }
}

impl<U: UsageLedger + ?Sized + 'static> Drop for ReservationGuard<U> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        let id = self.record.id;
        warn!(
            consignment_number = self.record.consignment_number,
            "Reservation dropped uncommitted, releasing"
        );

        let usage = self.usage.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = usage.release(id).await {
                        error!("Failed to release abandoned reservation {}: {}", id, e);
                    }
                });
            }
            Err(_) => error!("No runtime to release abandoned reservation {}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_db::{MemoryRangeLedger, MemoryUsageLedger};

    fn range(start: i64, end: i64) -> RangeAssignment {
        RangeAssignment::new(&EntityRef::corporate("c-1"), start, end)
    }

    #[test]
    fn test_next_free_number_lowest_gap() {
        let ranges = vec![range(100, 110)];
        assert_eq!(next_free_number(&ranges, &[]), Some(100));
        assert_eq!(next_free_number(&ranges, &[100, 101, 103]), Some(102));
        assert_eq!(next_free_number(&ranges, &[101, 100]), Some(102));
    }

    #[test]
    fn test_next_free_number_continues_into_next_range() {
        let ranges = vec![range(200, 205), range(100, 102)];
        assert_eq!(next_free_number(&ranges, &[100, 101, 102]), Some(200));
    }

    #[test]
    fn test_next_free_number_skips_inactive_and_exhausts() {
        let mut revoked = range(1, 5);
        revoked.is_active = false;
        let ranges = vec![revoked, range(10, 11)];
        assert_eq!(next_free_number(&ranges, &[]), Some(10));
        assert_eq!(next_free_number(&ranges, &[10, 11]), None);
        assert_eq!(next_free_number(&[], &[]), None);
    }

    #[test]
    fn test_next_free_number_ignores_foreign_used_numbers() {
        let ranges = vec![range(50, 52)];
        assert_eq!(next_free_number(&ranges, &[1, 2, 3, 99]), Some(50));
    }

    fn service() -> (
        Arc<MemoryRangeLedger>,
        Arc<MemoryUsageLedger>,
        AllocationService<MemoryRangeLedger, MemoryUsageLedger>,
    ) {
        let ranges = Arc::new(MemoryRangeLedger::new());
        let usage = Arc::new(MemoryUsageLedger::new(ranges.clone()));
        let service =
            AllocationService::new(ranges.clone(), usage.clone(), AllocationConfig::default());
        (ranges, usage, service)
    }

    #[tokio::test]
    async fn test_no_range_assigned() {
        let (_, _, service) = service();
        let result = service.allocate(&EntityRef::office("o-1")).await;
        assert!(matches!(result, Err(AppError::NoRangeAssigned(_))));
    }

    #[tokio::test]
    async fn test_guard_drop_releases_reservation() {
        let (ranges, usage, service) = service();
        let entity = EntityRef::office("o-2");
        ranges
            .create(&RangeAssignment::new(&entity, 1, 3))
            .await
            .unwrap();

        let guard = service
            .reserve_with(&entity, |n| UsageRecord::placeholder(&entity, n))
            .await
            .unwrap();
        assert_eq!(guard.record().consignment_number, 1);
        drop(guard);

        // Release runs on a spawned task
        for _ in 0..50 {
            if usage.is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(usage.is_empty());
        assert_eq!(service.allocate(&entity).await.unwrap().consignment_number, 1);
    }

    #[tokio::test]
    async fn test_explicit_release() {
        let (ranges, _, service) = service();
        let entity = EntityRef::corporate("c-9");
        ranges
            .create(&RangeAssignment::new(&entity, 7, 7))
            .await
            .unwrap();

        let guard = service
            .reserve_with(&entity, |n| UsageRecord::placeholder(&entity, n))
            .await
            .unwrap();
        assert!(guard.release().await.unwrap());

        let summary = service.summary(&entity).await.unwrap();
        assert_eq!(summary.available_count, 1);

        let record = service.allocate(&entity).await.unwrap();
        assert!(service.release(record.id).await.unwrap());
        assert!(!service.release(record.id).await.unwrap());
    }

    #[test]
    fn test_jittered_backoff_within_bounds() {
        let (_, _, service) = service();
        for attempt in 1..8 {
            let ceiling = service.config.backoff(attempt);
            let delay = service.jittered_backoff(attempt);
            assert!(delay <= ceiling);
            assert!(delay >= ceiling / 2);
        }
    }
}
