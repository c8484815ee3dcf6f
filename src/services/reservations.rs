//! Reservation lifecycle service
//!
//! Implements the state machine: `pending -> approved | rejected |
//! cancelled`; `approved -> active | completed | cancelled | expired`;
//! `active -> completed | cancelled | expired`. Capacity-affecting
//! transitions run in a single transaction that locks the reservation row
//! and the referenced equipment rows before re-checking availability, so
//! two concurrent approvals of the last unit serialize and exactly one
//! succeeds.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::Postgres;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::{EquipmentStatus, ReservationStatus},
        reservation::{
            compute_deposit, line_total, rental_duration, CreateReservation, PricedLine,
            Reservation, ReservationDetails, ReservationQuery,
        },
        user::UserClaims,
    },
    repository::Repository,
};

fn ensure_transition(from: ReservationStatus, to: ReservationStatus) -> AppResult<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition(format!(
            "Cannot move reservation from {} to {}",
            from, to
        )))
    }
}

#[derive(Clone)]
pub struct ReservationsService {
    repository: Repository,
}

impl ReservationsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Get a reservation with its lines; clients only see their own
    pub async fn get_details(&self, id: i32, claims: &UserClaims) -> AppResult<ReservationDetails> {
        let details = self.repository.reservations.get_details(id).await?;
        claims.require_self_or_admin(details.reservation.user_id.unwrap_or(-1))?;
        Ok(details)
    }

    /// List reservations; clients are restricted to their own
    pub async fn list(
        &self,
        query: &ReservationQuery,
        claims: &UserClaims,
    ) -> AppResult<Vec<Reservation>> {
        // Clients only see their own live records; the user filter and
        // soft-deleted visibility are admin capabilities.
        let (restrict_user, include_deleted) = if claims.is_admin() {
            (None, query.include_deleted.unwrap_or(false))
        } else {
            (Some(claims.user_id), false)
        };
        self.repository
            .reservations
            .list(query, restrict_user, include_deleted)
            .await
    }

    /// Create a new reservation in `pending` status.
    ///
    /// Validates dates and lines, checks derived availability for every
    /// line and fails the whole request on any shortfall. No counter is
    /// touched: pending reservations hold no capacity.
    pub async fn create(&self, user_id: i32, data: &CreateReservation) -> AppResult<ReservationDetails> {
        data.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let today = Utc::now().date_naive();
        if data.start_date >= data.end_date {
            return Err(AppError::Validation(
                "start date must be before end date".to_string(),
            ));
        }
        if data.start_date < today {
            return Err(AppError::Validation(
                "start date cannot be in the past".to_string(),
            ));
        }

        let user = self.repository.users.get_by_id(user_id).await?;
        if !user.is_active {
            return Err(AppError::Validation("user account is deactivated".to_string()));
        }

        let mut seen = std::collections::HashSet::new();
        for line in &data.equipment {
            if !seen.insert(line.equipment_id) {
                return Err(AppError::Validation(format!(
                    "equipment {} listed more than once",
                    line.equipment_id
                )));
            }
        }

        let duration = rental_duration(data.start_date, data.end_date);
        let mut priced = Vec::with_capacity(data.equipment.len());
        let mut subtotal = Decimal::ZERO;

        for line in &data.equipment {
            let equipment = self.repository.equipment.get_by_id(line.equipment_id).await?;
            let status = EquipmentStatus::from(equipment.status);
            if !status.is_operational() {
                return Err(AppError::InsufficientAvailability(format!(
                    "{} is not rentable (status: {})",
                    equipment.name, status
                )));
            }

            let committed = self
                .repository
                .reservations
                .committed_quantity(
                    &self.repository.pool,
                    line.equipment_id,
                    data.start_date,
                    data.end_date,
                    None,
                )
                .await?;
            let free = equipment.quantity - committed;
            if free < line.quantity {
                return Err(AppError::InsufficientAvailability(format!(
                    "{}: available {}, requested {}",
                    equipment.name,
                    free.max(0),
                    line.quantity
                )));
            }

            let total_price = line_total(equipment.price_per_day, line.quantity, duration);
            subtotal += total_price;
            priced.push(PricedLine {
                equipment_id: line.equipment_id,
                quantity: line.quantity,
                price_per_day: equipment.price_per_day,
                total_price,
            });
        }

        let deposit = compute_deposit(subtotal);
        let total = subtotal + deposit;

        let reservation = self
            .repository
            .reservations
            .create(
                user_id,
                data.start_date,
                data.end_date,
                duration,
                subtotal,
                deposit,
                total,
                &priced,
                data.client_notes.as_deref(),
            )
            .await?;

        tracing::info!(
            reservation = %reservation.number,
            user_id,
            start = %data.start_date,
            end = %data.end_date,
            "reservation created"
        );

        self.repository.reservations.get_details(reservation.id).await
    }

    /// Approve a pending reservation (admin).
    ///
    /// Re-runs the availability check per line with the reservation itself
    /// excluded, under row locks on the equipment, then resyncs each
    /// equipment's availability projection in the same transaction.
    pub async fn approve(&self, id: i32, admin_notes: Option<&str>) -> AppResult<ReservationDetails> {
        let mut tx = self.repository.pool.begin().await?;

        let reservation = self.repository.reservations.get_for_update(&mut tx, id).await?;
        let status = ReservationStatus::from(reservation.status);
        ensure_transition(status, ReservationStatus::Approved)?;

        let lines = self.repository.reservations.get_lines(&mut *tx, id).await?;
        let mut equipment_ids: Vec<i32> = lines.iter().map(|l| l.equipment_id).collect();
        equipment_ids.sort_unstable();
        equipment_ids.dedup();

        let equipment_rows = self
            .repository
            .equipment
            .get_many_for_update(&mut tx, &equipment_ids)
            .await?;

        for line in &lines {
            let equipment = equipment_rows
                .iter()
                .find(|e| e.id == line.equipment_id)
                .ok_or_else(|| {
                    AppError::Internal(format!(
                        "reservation {} references missing equipment {}",
                        id, line.equipment_id
                    ))
                })?;

            let committed = self
                .repository
                .reservations
                .committed_quantity(
                    &mut *tx,
                    line.equipment_id,
                    reservation.start_date,
                    reservation.end_date,
                    Some(id),
                )
                .await?;
            let free = equipment.quantity - committed;
            if free < line.quantity {
                return Err(AppError::InsufficientAvailability(format!(
                    "{}: available {}, requested {}",
                    equipment.name,
                    free.max(0),
                    line.quantity
                )));
            }
        }

        self.repository
            .reservations
            .set_status(&mut *tx, id, ReservationStatus::Approved)
            .await?;
        if let Some(notes) = admin_notes {
            self.repository.reservations.set_admin_notes(&mut *tx, id, notes).await?;
        }

        let today = Utc::now().date_naive();
        for equipment_id in &equipment_ids {
            self.repository
                .equipment
                .sync_available(&mut *tx, *equipment_id, today)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(reservation = %reservation.number, "reservation approved");
        self.repository.reservations.get_details(id).await
    }

    /// Reject a pending reservation with a mandatory reason (admin).
    /// Pending reservations never held capacity, so no inventory effect.
    pub async fn reject(&self, id: i32, reason: &str) -> AppResult<ReservationDetails> {
        if reason.trim().is_empty() {
            return Err(AppError::Validation("rejection reason is required".to_string()));
        }

        let mut tx = self.repository.pool.begin().await?;
        let reservation = self.repository.reservations.get_for_update(&mut tx, id).await?;
        ensure_transition(
            ReservationStatus::from(reservation.status),
            ReservationStatus::Rejected,
        )?;
        self.repository.reservations.set_rejection(&mut *tx, id, reason).await?;
        tx.commit().await?;

        tracing::info!(reservation = %reservation.number, reason, "reservation rejected");
        self.repository.reservations.get_details(id).await
    }

    /// Mark an approved reservation as picked up (admin)
    pub async fn activate(&self, id: i32) -> AppResult<ReservationDetails> {
        let mut tx = self.repository.pool.begin().await?;
        let reservation = self.repository.reservations.get_for_update(&mut tx, id).await?;
        ensure_transition(
            ReservationStatus::from(reservation.status),
            ReservationStatus::Active,
        )?;
        self.repository
            .reservations
            .set_status(&mut *tx, id, ReservationStatus::Active)
            .await?;
        self.resync_lines(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(reservation = %reservation.number, "reservation activated");
        self.repository.reservations.get_details(id).await
    }

    /// Complete a rental: releases the held capacity (admin)
    pub async fn complete(&self, id: i32) -> AppResult<ReservationDetails> {
        let mut tx = self.repository.pool.begin().await?;
        let reservation = self.repository.reservations.get_for_update(&mut tx, id).await?;
        ensure_transition(
            ReservationStatus::from(reservation.status),
            ReservationStatus::Completed,
        )?;
        self.repository
            .reservations
            .set_status(&mut *tx, id, ReservationStatus::Completed)
            .await?;
        self.resync_lines(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(reservation = %reservation.number, "reservation completed");
        self.repository.reservations.get_details(id).await
    }

    /// Cancel a reservation. Clients may cancel only their own pending
    /// reservations; admins any eligible state. Held capacity is released.
    pub async fn cancel(
        &self,
        id: i32,
        claims: &UserClaims,
        reason: Option<&str>,
    ) -> AppResult<ReservationDetails> {
        let mut tx = self.repository.pool.begin().await?;
        let reservation = self.repository.reservations.get_for_update(&mut tx, id).await?;
        let status = ReservationStatus::from(reservation.status);

        if !claims.is_admin() {
            claims.require_self_or_admin(reservation.user_id.unwrap_or(-1))?;
            if status != ReservationStatus::Pending {
                return Err(AppError::InvalidTransition(
                    "clients may only cancel pending reservations".to_string(),
                ));
            }
        }
        ensure_transition(status, ReservationStatus::Cancelled)?;

        self.repository
            .reservations
            .set_status(&mut *tx, id, ReservationStatus::Cancelled)
            .await?;
        if let Some(reason) = reason {
            self.repository.reservations.set_admin_notes(&mut *tx, id, reason).await?;
        }
        if status.holds_capacity() {
            self.resync_lines(&mut tx, id).await?;
        }
        tx.commit().await?;

        tracing::info!(reservation = %reservation.number, from = %status, "reservation cancelled");
        self.repository.reservations.get_details(id).await
    }

    /// Expire an overdue commitment-holding reservation. System-only:
    /// invoked by the reconciliation sweep, never exposed over the API.
    /// Returns false when the reservation no longer qualifies (idempotent).
    pub async fn expire(&self, id: i32) -> AppResult<bool> {
        let mut tx = self.repository.pool.begin().await?;
        let reservation = self.repository.reservations.get_for_update(&mut tx, id).await?;
        let status = ReservationStatus::from(reservation.status);
        if !status.holds_capacity() {
            // Already expired or otherwise terminal; nothing to do.
            return Ok(false);
        }
        ensure_transition(status, ReservationStatus::Expired)?;

        self.repository
            .reservations
            .set_status(&mut *tx, id, ReservationStatus::Expired)
            .await?;
        self.resync_lines(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(reservation = %reservation.number, "reservation expired");
        Ok(true)
    }

    /// Resync the availability projection of every equipment referenced by
    /// a reservation, inside the caller's transaction.
    pub(crate) async fn resync_lines(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        reservation_id: i32,
    ) -> AppResult<usize> {
        let lines = self.repository.reservations.get_lines(&mut **tx, reservation_id).await?;
        let mut equipment_ids: Vec<i32> = lines.iter().map(|l| l.equipment_id).collect();
        equipment_ids.sort_unstable();
        equipment_ids.dedup();

        let today = Utc::now().date_naive();
        for equipment_id in &equipment_ids {
            self.repository
                .equipment
                .sync_available(&mut **tx, *equipment_id, today)
                .await?;
        }
        Ok(equipment_ids.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_guard_rejects_ineligible_source() {
        let err = ensure_transition(ReservationStatus::Approved, ReservationStatus::Approved)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));

        let err = ensure_transition(ReservationStatus::Completed, ReservationStatus::Cancelled)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[test]
    fn transition_guard_allows_lifecycle_path() {
        assert!(ensure_transition(ReservationStatus::Pending, ReservationStatus::Approved).is_ok());
        assert!(ensure_transition(ReservationStatus::Approved, ReservationStatus::Active).is_ok());
        assert!(ensure_transition(ReservationStatus::Active, ReservationStatus::Completed).is_ok());
    }
}
