//! Reconciliation and expiration sweep
//!
//! Three idempotent passes over the ledger and the inventory store:
//! expire (hourly), cleanup (daily), consistency (weekly). Each unit of
//! work is processed independently; a failure is logged, counted and
//! never aborts the batch. All three are also invokable on demand from
//! the admin endpoint.

use chrono::{Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    config::SweepConfig,
    error::AppResult,
    repository::Repository,
};

use super::reservations::ReservationsService;

/// Outcome summary of one sweep run
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct SweepSummary {
    /// Units of work examined
    pub processed: usize,
    /// Reservations transitioned to expired
    pub expired: usize,
    /// Equipment counters corrected by the consistency pass
    pub corrected: usize,
    /// Terminal reservations soft-deleted by the cleanup pass
    pub cleaned: usize,
    pub errors: Vec<String>,
}

impl SweepSummary {
    fn merge(&mut self, other: SweepSummary) {
        self.processed += other.processed;
        self.expired += other.expired;
        self.corrected += other.corrected;
        self.cleaned += other.cleaned;
        self.errors.extend(other.errors);
    }
}

#[derive(Clone)]
pub struct ReconciliationService {
    repository: Repository,
    reservations: ReservationsService,
    config: SweepConfig,
}

impl ReconciliationService {
    pub fn new(repository: Repository, reservations: ReservationsService, config: SweepConfig) -> Self {
        Self {
            repository,
            reservations,
            config,
        }
    }

    /// Expire pass: force-transition commitment-holding reservations whose
    /// rental period is over and release their inventory. Idempotent:
    /// expired records are no longer commitment-holding and never
    /// re-selected.
    pub async fn run_expire_pass(&self) -> AppResult<SweepSummary> {
        let today = Utc::now().date_naive();
        let ids = self.repository.reservations.find_expirable(today).await?;

        let mut summary = SweepSummary {
            processed: ids.len(),
            ..Default::default()
        };

        for id in ids {
            match self.reservations.expire(id).await {
                Ok(true) => summary.expired += 1,
                Ok(false) => {} // lost a race with another transition
                Err(e) => {
                    tracing::warn!(reservation_id = id, error = %e, "expire pass failed for reservation");
                    summary.errors.push(format!("reservation {}: {}", id, e));
                }
            }
        }

        if summary.expired > 0 || !summary.errors.is_empty() {
            tracing::info!(
                processed = summary.processed,
                expired = summary.expired,
                errors = summary.errors.len(),
                "expire pass finished"
            );
        }
        Ok(summary)
    }

    /// Consistency pass: recompute every equipment's `available` projection
    /// from the ledger and correct stored values that drifted. Drift means
    /// a bug elsewhere; every correction is logged and counted.
    pub async fn run_consistency_pass(&self) -> AppResult<SweepSummary> {
        let today = Utc::now().date_naive();
        let drifted = self.repository.equipment.find_drifted(today).await?;

        let mut summary = SweepSummary {
            processed: drifted.len(),
            ..Default::default()
        };

        for drift in drifted {
            tracing::warn!(
                equipment_id = drift.equipment_id,
                equipment = %drift.name,
                stored = drift.stored,
                computed = drift.computed,
                "availability drift detected, correcting"
            );
            match self
                .repository
                .equipment
                .sync_available(&self.repository.pool, drift.equipment_id, today)
                .await
            {
                Ok(_) => summary.corrected += 1,
                Err(e) => {
                    tracing::warn!(equipment_id = drift.equipment_id, error = %e, "drift correction failed");
                    summary
                        .errors
                        .push(format!("equipment {}: {}", drift.equipment_id, e));
                }
            }
        }

        if summary.corrected > 0 {
            tracing::info!(corrected = summary.corrected, "consistency pass corrected drift");
        }
        Ok(summary)
    }

    /// Cleanup pass: soft-delete terminal non-completed reservations older
    /// than the retention window. Never purges rows.
    pub async fn run_cleanup_pass(&self) -> AppResult<SweepSummary> {
        let cutoff = Utc::now() - Duration::days(self.config.retention_days);
        let ids = self.repository.reservations.cleanup_terminal(cutoff).await?;

        let summary = SweepSummary {
            processed: ids.len(),
            cleaned: ids.len(),
            ..Default::default()
        };
        if summary.cleaned > 0 {
            tracing::info!(cleaned = summary.cleaned, "cleanup pass soft-deleted old terminal reservations");
        }
        Ok(summary)
    }

    /// Run all three passes (operator trigger)
    pub async fn run_full(&self) -> AppResult<SweepSummary> {
        let mut summary = self.run_expire_pass().await?;
        summary.merge(self.run_consistency_pass().await?);
        summary.merge(self.run_cleanup_pass().await?);
        Ok(summary)
    }
}
