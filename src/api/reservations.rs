//! Reservation lifecycle endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::reservation::{CreateReservation, Reservation, ReservationDetails, ReservationQuery},
};

use super::AuthenticatedUser;

/// Approve request body
#[derive(Deserialize, ToSchema)]
pub struct ApproveRequest {
    pub admin_notes: Option<String>,
}

/// Reject request body
#[derive(Deserialize, ToSchema)]
pub struct RejectRequest {
    /// Mandatory, surfaced to the client
    pub reason: String,
}

/// Cancel request body
#[derive(Deserialize, ToSchema)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

/// List reservations (admins: all, with filters; clients: their own)
#[utoipa::path(
    get,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(ReservationQuery),
    responses(
        (status = 200, description = "Reservation list", body = Vec<Reservation>)
    )
)]
pub async fn list_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ReservationQuery>,
) -> AppResult<Json<Vec<Reservation>>> {
    let reservations = state.services.reservations.list(&query, &claims).await?;
    Ok(Json(reservations))
}

/// Get a reservation with its equipment lines
#[utoipa::path(
    get,
    path = "/reservations/{id}",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation details", body = ReservationDetails),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn get_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ReservationDetails>> {
    let details = state.services.reservations.get_details(id, &claims).await?;
    Ok(Json(details))
}

/// Create a reservation (status: pending)
#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    request_body = CreateReservation,
    responses(
        (status = 201, description = "Reservation created", body = ReservationDetails),
        (status = 400, description = "Invalid dates or quantities"),
        (status = 409, description = "Insufficient availability")
    )
)]
pub async fn create_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateReservation>,
) -> AppResult<(StatusCode, Json<ReservationDetails>)> {
    // Clients book for themselves; admins may book on behalf of a client.
    let user_id = match data.user_id {
        Some(target) if target != claims.user_id => {
            claims.require_admin()?;
            target
        }
        _ => claims.user_id,
    };
    let details = state.services.reservations.create(user_id, &data).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

/// Approve a pending reservation (admin)
#[utoipa::path(
    post,
    path = "/reservations/{id}/approve",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    request_body = ApproveRequest,
    responses(
        (status = 200, description = "Reservation approved", body = ReservationDetails),
        (status = 409, description = "Insufficient availability"),
        (status = 422, description = "Not in an approvable state")
    )
)]
pub async fn approve_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<ApproveRequest>,
) -> AppResult<Json<ReservationDetails>> {
    claims.require_admin()?;
    let details = state
        .services
        .reservations
        .approve(id, request.admin_notes.as_deref())
        .await?;
    Ok(Json(details))
}

/// Reject a pending reservation (admin, reason required)
#[utoipa::path(
    post,
    path = "/reservations/{id}/reject",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    request_body = RejectRequest,
    responses(
        (status = 200, description = "Reservation rejected", body = ReservationDetails),
        (status = 400, description = "Missing reason"),
        (status = 422, description = "Not in a rejectable state")
    )
)]
pub async fn reject_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<RejectRequest>,
) -> AppResult<Json<ReservationDetails>> {
    claims.require_admin()?;
    let details = state.services.reservations.reject(id, &request.reason).await?;
    Ok(Json(details))
}

/// Mark an approved reservation as picked up (admin)
#[utoipa::path(
    post,
    path = "/reservations/{id}/activate",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation activated", body = ReservationDetails),
        (status = 422, description = "Not in an activatable state")
    )
)]
pub async fn activate_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ReservationDetails>> {
    claims.require_admin()?;
    let details = state.services.reservations.activate(id).await?;
    Ok(Json(details))
}

/// Complete a rental, releasing its inventory (admin)
#[utoipa::path(
    post,
    path = "/reservations/{id}/complete",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation completed", body = ReservationDetails),
        (status = 422, description = "Not in a completable state")
    )
)]
pub async fn complete_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ReservationDetails>> {
    claims.require_admin()?;
    let details = state.services.reservations.complete(id).await?;
    Ok(Json(details))
}

/// Cancel a reservation (clients: own pending only; admins: any eligible)
#[utoipa::path(
    post,
    path = "/reservations/{id}/cancel",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    request_body = CancelRequest,
    responses(
        (status = 200, description = "Reservation cancelled", body = ReservationDetails),
        (status = 403, description = "Not the owner"),
        (status = 422, description = "Not in a cancellable state")
    )
)]
pub async fn cancel_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    request: Option<Json<CancelRequest>>,
) -> AppResult<Json<ReservationDetails>> {
    let reason = request.as_ref().and_then(|r| r.reason.as_deref());
    let details = state.services.reservations.cancel(id, &claims, reason).await?;
    Ok(Json(details))
}
