//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{admin, auth, equipment, health, reservations, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "CineRent API",
        version = "1.0.0",
        description = "Cinema Equipment Rental Management REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html"),
        contact(name = "CineRent Team", email = "contact@cinerent.org")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::me,
        // Equipment
        equipment::list_equipment,
        equipment::get_equipment,
        equipment::check_availability,
        equipment::create_equipment,
        equipment::update_equipment,
        equipment::delete_equipment,
        // Reservations
        reservations::list_reservations,
        reservations::get_reservation,
        reservations::create_reservation,
        reservations::approve_reservation,
        reservations::reject_reservation,
        reservations::activate_reservation,
        reservations::complete_reservation,
        reservations::cancel_reservation,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        users::deactivate_user,
        // Admin
        admin::run_sweep,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            // Equipment
            crate::models::equipment::Equipment,
            crate::models::equipment::CreateEquipment,
            crate::models::equipment::UpdateEquipment,
            crate::services::availability::AvailabilityReport,
            crate::repository::reservations::OverlappingReservation,
            // Reservations
            crate::models::reservation::Reservation,
            crate::models::reservation::ReservationLine,
            crate::models::reservation::ReservationLineDetails,
            crate::models::reservation::ReservationDetails,
            crate::models::reservation::CreateReservation,
            crate::models::reservation::CreateReservationLine,
            reservations::ApproveRequest,
            reservations::RejectRequest,
            reservations::CancelRequest,
            // Users
            crate::models::user::User,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUser,
            crate::services::cascade::CascadeSummary,
            // Admin
            crate::services::reconciliation::SweepSummary,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "equipment", description = "Equipment catalog and availability"),
        (name = "reservations", description = "Reservation lifecycle"),
        (name = "users", description = "User management"),
        (name = "admin", description = "Maintenance operations")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
