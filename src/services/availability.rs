//! Availability checking for equipment over date ranges
//!
//! Capacity is never read from the cached `available` counter here: the
//! derived availability of an equipment over a range is always
//! `quantity - committed`, where `committed` sums the line quantities of
//! commitment-holding reservations (approved, active) overlapping the
//! range. Every commitment-holding reservation blocks its full quantity
//! for its whole range, which is what lets a single sum replace a per-day
//! calendar.

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    repository::{reservations::OverlappingReservation, Repository},
};

/// Availability report for one equipment over a date range
#[derive(Debug, Serialize, ToSchema)]
pub struct AvailabilityReport {
    pub equipment_id: i32,
    pub equipment_name: String,
    pub quantity: i32,
    /// Units free over the queried range (`quantity - committed`)
    pub available: i32,
    pub conflicts: Vec<OverlappingReservation>,
}

#[derive(Clone)]
pub struct AvailabilityService {
    repository: Repository,
}

impl AvailabilityService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Full availability report with the conflicting reservations listed
    pub async fn check(
        &self,
        equipment_id: i32,
        start: NaiveDate,
        end: NaiveDate,
        exclude: Option<i32>,
    ) -> AppResult<AvailabilityReport> {
        let equipment = self.repository.equipment.get_by_id(equipment_id).await?;
        let conflicts = self
            .repository
            .reservations
            .overlapping_reservations(equipment_id, start, end, exclude)
            .await?;
        let committed: i32 = conflicts.iter().map(|c| c.quantity).sum();
        Ok(AvailabilityReport {
            equipment_id,
            equipment_name: equipment.name,
            quantity: equipment.quantity,
            available: equipment.quantity - committed,
            conflicts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Mirror of the SQL overlap predicate used by the committed-quantity
    /// queries: `[s1, e1)` and `[s2, e2)` overlap iff `s1 < e2 && e1 > s2`.
    /// A rental ending on day X does not conflict with one starting on
    /// day X (the return day is the next renter's pickup day).
    fn ranges_overlap(s1: NaiveDate, e1: NaiveDate, s2: NaiveDate, e2: NaiveDate) -> bool {
        s1 < e2 && e1 > s2
    }

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn overlapping_ranges_conflict() {
        // contained overlap
        assert!(ranges_overlap(
            d("2025-06-01"),
            d("2025-06-05"),
            d("2025-06-03"),
            d("2025-06-04")
        ));
    }

    #[test]
    fn touching_boundaries_do_not_conflict() {
        // back-to-back rentals: return day doubles as the next pickup day
        assert!(!ranges_overlap(
            d("2025-06-01"),
            d("2025-06-05"),
            d("2025-06-05"),
            d("2025-06-07")
        ));
        // and symmetrically
        assert!(!ranges_overlap(
            d("2025-06-05"),
            d("2025-06-07"),
            d("2025-06-01"),
            d("2025-06-05")
        ));
    }

    #[test]
    fn containment_conflicts() {
        assert!(ranges_overlap(
            d("2025-06-02"),
            d("2025-06-03"),
            d("2025-06-01"),
            d("2025-06-10")
        ));
    }

    #[test]
    fn disjoint_ranges_do_not_conflict() {
        assert!(!ranges_overlap(
            d("2025-06-01"),
            d("2025-06-03"),
            d("2025-06-10"),
            d("2025-06-12")
        ));
    }
}
