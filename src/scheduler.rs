//! Background scheduler for the reconciliation sweep
//!
//! Drives the three passes on fixed intervals: expire hourly, cleanup
//! daily, full recomputation weekly (all configurable). Each pass is
//! idempotent and independently invocable, so a missed or doubled tick
//! is harmless.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};

use crate::{config::SweepConfig, services::Services};

/// Spawn the recurring sweep tasks. Returns immediately; the tasks run
/// for the lifetime of the process.
pub fn spawn_sweeps(services: Arc<Services>, config: &SweepConfig) {
    spawn_pass(
        "expire",
        Duration::from_secs(config.expire_interval_secs),
        services.clone(),
        |s| async move { s.reconciliation.run_expire_pass().await },
    );
    spawn_pass(
        "cleanup",
        Duration::from_secs(config.cleanup_interval_secs),
        services.clone(),
        |s| async move { s.reconciliation.run_cleanup_pass().await },
    );
    spawn_pass(
        "consistency",
        Duration::from_secs(config.reconcile_interval_secs),
        services,
        |s| async move { s.reconciliation.run_consistency_pass().await },
    );
}

fn spawn_pass<F, Fut>(name: &'static str, period: Duration, services: Arc<Services>, run: F)
where
    F: Fn(Arc<Services>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = crate::error::AppResult<crate::services::reconciliation::SweepSummary>>
        + Send,
{
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick fires immediately; skip it so startup stays quiet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            tracing::debug!(pass = name, "sweep tick");
            if let Err(e) = run(services.clone()).await {
                tracing::error!(pass = name, error = %e, "sweep pass failed");
            }
        }
    });
}
