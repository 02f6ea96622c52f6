//! Consignment range assignment model
//!
//! A range assignment is an administratively granted, contiguous block of
//! consignment numbers owned by one entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::{EntityRef, EntityType};

/// Range assignment entity
///
/// Never mutated after creation except for toggling `is_active`
/// (soft revoke). Within one entity, active ranges never overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeAssignment {
    /// Unique identifier
    pub id: i64,

    /// Owning entity kind
    pub entity_type: EntityType,

    /// Owning entity identifier
    pub entity_id: String,

    /// First number of the block (inclusive)
    pub start_number: i64,

    /// Last number of the block (inclusive)
    pub end_number: i64,

    /// When the block was granted
    pub assigned_at: DateTime<Utc>,

    /// Soft-revoke flag
    pub is_active: bool,
}

impl RangeAssignment {
    /// Create a new, active range assignment (id assigned by the ledger)
    pub fn new(entity: &EntityRef, start_number: i64, end_number: i64) -> Self {
        Self {
            id: 0,
            entity_type: entity.entity_type,
            entity_id: entity.entity_id.clone(),
            start_number,
            end_number,
            assigned_at: Utc::now(),
            is_active: true,
        }
    }

    /// Owning entity
    pub fn entity(&self) -> EntityRef {
        EntityRef::new(self.entity_type, self.entity_id.clone())
    }

    /// Number of consignment numbers in the block
    #[inline]
    pub fn total_numbers(&self) -> i64 {
        self.end_number - self.start_number + 1
    }

    /// Check that the bounds describe a non-empty block
    pub fn is_well_formed(&self) -> bool {
        self.start_number >= 0 && self.start_number <= self.end_number
    }

    /// Check if a number falls inside this block
    #[inline]
    pub fn contains(&self, number: i64) -> bool {
        number >= self.start_number && number <= self.end_number
    }

    /// Check if two blocks share at least one number
    pub fn overlaps(&self, other: &RangeAssignment) -> bool {
        self.start_number <= other.end_number && other.start_number <= self.end_number
    }
}

/// Advisory view of an entity's consignment capacity
///
/// Stale as soon as it is read: the authoritative check is the atomic
/// allocation itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AllocationSummary {
    pub has_assignment: bool,
    pub total_assigned: i64,
    pub used_count: i64,
    pub available_count: i64,
}

impl AllocationSummary {
    /// Build a summary from active ranges and the numbers already used
    pub fn from_ranges<'a>(
        ranges: impl IntoIterator<Item = &'a RangeAssignment>,
        used: impl IntoIterator<Item = i64>,
    ) -> Self {
        let active: Vec<&RangeAssignment> = ranges.into_iter().filter(|r| r.is_active).collect();
        let total_assigned: i64 = active.iter().map(|r| r.total_numbers()).sum();
        let used_count = used
            .into_iter()
            .filter(|n| active.iter().any(|r| r.contains(*n)))
            .count() as i64;

        Self {
            has_assignment: !active.is_empty(),
            total_assigned,
            used_count,
            available_count: (total_assigned - used_count).max(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: i64, end: i64) -> RangeAssignment {
        RangeAssignment::new(&EntityRef::corporate("c1"), start, end)
    }

    #[test]
    fn test_total_numbers_is_inclusive() {
        assert_eq!(range(100, 102).total_numbers(), 3);
        assert_eq!(range(7, 7).total_numbers(), 1);
    }

    #[test]
    fn test_well_formed() {
        assert!(range(1, 1).is_well_formed());
        assert!(!range(5, 4).is_well_formed());
    }

    #[test]
    fn test_overlaps() {
        assert!(range(100, 200).overlaps(&range(200, 300)));
        assert!(range(150, 160).overlaps(&range(100, 200)));
        assert!(!range(100, 102).overlaps(&range(103, 110)));
    }

    #[test]
    fn test_summary_ignores_inactive_and_foreign_numbers() {
        let mut revoked = range(500, 509);
        revoked.is_active = false;
        let ranges = vec![range(100, 102), range(200, 205), revoked];

        let summary = AllocationSummary::from_ranges(&ranges, vec![100, 101, 200, 505, 999]);

        assert!(summary.has_assignment);
        assert_eq!(summary.total_assigned, 9);
        assert_eq!(summary.used_count, 3);
        assert_eq!(summary.available_count, 6);
    }

    #[test]
    fn test_summary_without_ranges() {
        let summary = AllocationSummary::from_ranges(&Vec::<RangeAssignment>::new(), Vec::new());
        assert_eq!(summary, AllocationSummary::default());
    }
}
