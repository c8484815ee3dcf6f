//! Cascade handling for user removal and deactivation
//!
//! Walks a user's open reservations and drives each through the
//! compensating cancel transition, releasing held inventory. Both callers
//! share the per-reservation logic and differ only in which statuses
//! qualify: hard deletion also cancels active rentals, deactivation only
//! pending and approved ones. Completed reservations are terminal and are
//! left untouched in both cases.

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::enums::ReservationStatus,
    repository::Repository,
};

use super::reservations::ReservationsService;

/// Why a cascade ran; recorded as each reservation's deletion reason
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeCause {
    UserDeleted,
    UserDeactivated,
}

impl CascadeCause {
    pub fn as_str(self) -> &'static str {
        match self {
            CascadeCause::UserDeleted => "user_deleted",
            CascadeCause::UserDeactivated => "user_deactivated",
        }
    }

    /// Statuses eligible for forced cancellation under this cause
    fn qualifying_statuses(self) -> &'static [ReservationStatus] {
        match self {
            CascadeCause::UserDeleted => &[
                ReservationStatus::Pending,
                ReservationStatus::Approved,
                ReservationStatus::Active,
            ],
            CascadeCause::UserDeactivated => {
                &[ReservationStatus::Pending, ReservationStatus::Approved]
            }
        }
    }
}

/// Aggregate outcome of one cascade run
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct CascadeSummary {
    pub processed: usize,
    pub cancelled: usize,
    /// Equipment records whose availability projection was resynced
    pub equipment_released: usize,
    pub errors: Vec<String>,
}

#[derive(Clone)]
pub struct CascadeService {
    repository: Repository,
    reservations: ReservationsService,
}

impl CascadeService {
    pub fn new(repository: Repository, reservations: ReservationsService) -> Self {
        Self {
            repository,
            reservations,
        }
    }

    /// Cancel and soft-delete a user's qualifying reservations. Failures
    /// are collected per reservation and never abort the batch.
    pub async fn cancel_user_reservations(
        &self,
        user_id: i32,
        cause: CascadeCause,
    ) -> AppResult<CascadeSummary> {
        let ids = self
            .repository
            .reservations
            .user_reservations_in(user_id, cause.qualifying_statuses())
            .await?;

        let mut summary = CascadeSummary {
            processed: ids.len(),
            ..Default::default()
        };

        for id in ids {
            match self.cancel_one(id, cause).await {
                Ok(released) => {
                    summary.cancelled += 1;
                    summary.equipment_released += released;
                }
                Err(e) => {
                    tracing::warn!(reservation_id = id, user_id, error = %e, "cascade cancellation failed");
                    summary.errors.push(format!("reservation {}: {}", id, e));
                }
            }
        }

        tracing::info!(
            user_id,
            cause = cause.as_str(),
            processed = summary.processed,
            cancelled = summary.cancelled,
            errors = summary.errors.len(),
            "cascade finished"
        );
        Ok(summary)
    }

    /// Force-cancel one reservation: release held capacity, transition to
    /// cancelled, soft-delete with the cascade cause. Returns the number
    /// of equipment records resynced.
    async fn cancel_one(&self, reservation_id: i32, cause: CascadeCause) -> AppResult<usize> {
        let mut tx = self.repository.pool.begin().await?;
        let reservation = self
            .repository
            .reservations
            .get_for_update(&mut tx, reservation_id)
            .await?;
        let status = ReservationStatus::from(reservation.status);
        if status.is_terminal() {
            // Raced with another transition since selection; skip.
            return Ok(0);
        }

        self.repository
            .reservations
            .set_status(&mut *tx, reservation_id, ReservationStatus::Cancelled)
            .await?;
        self.repository
            .reservations
            .soft_delete(&mut *tx, reservation_id, cause.as_str())
            .await?;

        let released = if status.holds_capacity() {
            self.reservations.resync_lines(&mut tx, reservation_id).await?
        } else {
            0
        };
        tx.commit().await?;
        Ok(released)
    }
}
