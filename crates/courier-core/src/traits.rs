//! Common traits for ledgers, stores and caches
//!
//! The database layer implements these against PostgreSQL and in memory.

use crate::error::AppError;
use crate::models::{Booking, EntityRef, RangeAssignment, TariffVersion, UsageRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

/// Durable store of consignment ranges granted to entities
#[async_trait]
pub trait RangeLedger: Send + Sync {
    /// Store a new range; rejects malformed bounds and overlap with the
    /// entity's other active ranges
    async fn create(&self, range: &RangeAssignment) -> Result<RangeAssignment, AppError>;

    /// Active ranges of an entity ordered by `start_number`
    async fn find_active_by_entity(
        &self,
        entity: &EntityRef,
    ) -> Result<Vec<RangeAssignment>, AppError>;

    /// Toggle the soft-revoke flag
    async fn set_active(&self, id: i64, is_active: bool) -> Result<RangeAssignment, AppError>;
}

/// Append-only record of consumed consignment numbers
#[async_trait]
pub trait UsageLedger: Send + Sync {
    /// Insert a usage record
    ///
    /// Fails with `AllocationConflict` when the number is already used by
    /// the entity or no longer lies inside one of its active ranges.
    async fn reserve(&self, record: &UsageRecord) -> Result<UsageRecord, AppError>;

    /// Remove a reservation whose booking never committed
    async fn release(&self, id: Uuid) -> Result<bool, AppError>;

    /// Numbers already used by an entity, ascending
    async fn used_numbers(&self, entity: &EntityRef) -> Result<Vec<i64>, AppError>;

    /// Find the usage of one number
    async fn find_by_number(
        &self,
        entity: &EntityRef,
        consignment_number: i64,
    ) -> Result<Option<UsageRecord>, AppError>;

    /// Usage records of an entity, newest first
    async fn list_by_entity(
        &self,
        entity: &EntityRef,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<UsageRecord>, i64), AppError>;
}

/// Durable store of committed bookings
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Record `usage` and persist `booking` in one transaction
    ///
    /// The usage insert follows the rules of [`UsageLedger::reserve`] and
    /// fails with `AllocationConflict` when the number is taken. Any
    /// failure, or an abandoned call, leaves neither row behind.
    async fn persist(
        &self,
        usage: &UsageRecord,
        booking: &Booking,
    ) -> Result<(UsageRecord, Booking), AppError>;

    /// Find booking by its public reference
    async fn find_by_reference(&self, reference: &str) -> Result<Option<Booking>, AppError>;
}

/// Versioned tariff storage
#[async_trait]
pub trait TariffRepository: Send + Sync {
    /// Latest version effective at `at`
    async fn find_active(&self, at: DateTime<Utc>) -> Result<Option<TariffVersion>, AppError>;

    /// Earliest `effective_from` strictly after `after`
    async fn next_effective_from(
        &self,
        after: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, AppError>;

    /// Store a new version
    async fn create(&self, version: &TariffVersion) -> Result<TariffVersion, AppError>;
}

/// Cache service trait
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Get value from cache
    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError>;

    /// Set value in cache with TTL
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
    ) -> Result<(), AppError>;

    /// Delete value from cache
    async fn delete(&self, key: &str) -> Result<bool, AppError>;
}

/// Pagination parameters
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 1000),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl PaginationMeta {
    pub fn new(total: i64, page: i64, per_page: i64) -> Self {
        let total_pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            0
        };

        Self {
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination() {
        let p = Pagination::new(1, 10);
        assert_eq!(p.offset(), 0);
        assert_eq!(p.limit(), 10);

        let p = Pagination::new(3, 20);
        assert_eq!(p.offset(), 40);
    }

    #[test]
    fn test_pagination_bounds() {
        assert_eq!(Pagination::new(0, 10).page, 1);
        assert_eq!(Pagination::new(1, 2000).per_page, 1000);
    }

    #[test]
    fn test_pagination_meta() {
        assert_eq!(PaginationMeta::new(95, 1, 10).total_pages, 10);
        assert_eq!(PaginationMeta::new(101, 1, 10).total_pages, 11);
        assert_eq!(PaginationMeta::new(5, 1, 0).total_pages, 0);
    }
}
