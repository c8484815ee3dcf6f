//! Administrative maintenance endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::{AppError, AppResult},
    services::reconciliation::SweepSummary,
};

use super::AuthenticatedUser;

/// Sweep trigger parameters
#[derive(Deserialize, IntoParams)]
pub struct SweepQuery {
    /// Run only one pass: "expire", "consistency" or "cleanup".
    /// Omit to run all three.
    pub pass: Option<String>,
}

/// Trigger a maintenance sweep on demand (admin)
#[utoipa::path(
    post,
    path = "/admin/sweep",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(SweepQuery),
    responses(
        (status = 200, description = "Sweep summary", body = SweepSummary),
        (status = 400, description = "Unknown pass name"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn run_sweep(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<SweepQuery>,
) -> AppResult<Json<SweepSummary>> {
    claims.require_admin()?;
    let reconciliation = &state.services.reconciliation;
    let summary = match query.pass.as_deref() {
        None => reconciliation.run_full().await?,
        Some("expire") => reconciliation.run_expire_pass().await?,
        Some("consistency") => reconciliation.run_consistency_pass().await?,
        Some("cleanup") => reconciliation.run_cleanup_pass().await?,
        Some(other) => {
            return Err(AppError::Validation(format!(
                "unknown sweep pass '{}', expected expire, consistency or cleanup",
                other
            )))
        }
    };
    Ok(Json(summary))
}
