//! Reservation model and related types

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Fraction of the subtotal charged as a deposit.
const DEPOSIT_RATE: Decimal = Decimal::from_parts(2, 0, 0, false, 1); // 0.2

/// Reservation record from the ledger
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reservation {
    pub id: i32,
    /// Display-only unique number, `RES-<year>-<sequence>`
    pub number: String,
    /// Owning client; NULL once the user row has been hard-deleted
    pub user_id: Option<i32>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Billed days, inclusive of both endpoint days
    pub duration: i32,
    /// Status (0=pending, 1=approved, 2=active, 3=completed, 4=rejected,
    /// 5=cancelled, 6=expired)
    pub status: i16,
    pub subtotal: Decimal,
    pub deposit: Decimal,
    pub total: Decimal,
    pub client_notes: Option<String>,
    pub admin_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub activated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deletion_reason: Option<String>,
    pub crea_date: Option<DateTime<Utc>>,
    pub modif_date: Option<DateTime<Utc>>,
}

/// One equipment line of a reservation
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ReservationLine {
    pub id: i32,
    pub reservation_id: i32,
    pub equipment_id: i32,
    pub quantity: i32,
    pub price_per_day: Decimal,
    pub total_price: Decimal,
}

/// Line with the equipment name joined in, for display
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ReservationLineDetails {
    pub equipment_id: i32,
    pub equipment_name: String,
    pub quantity: i32,
    pub price_per_day: Decimal,
    pub total_price: Decimal,
}

/// Reservation with its lines, for display
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReservationDetails {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub lines: Vec<ReservationLineDetails>,
}

/// One requested equipment line
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateReservationLine {
    pub equipment_id: i32,
    #[validate(range(min = 1, message = "quantity must be positive"))]
    pub quantity: i32,
}

/// Create reservation request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReservation {
    /// Target client; admins may create on behalf of any client
    pub user_id: Option<i32>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(length(min = 1, message = "at least one equipment line required"))]
    #[validate(nested)]
    pub equipment: Vec<CreateReservationLine>,
    #[validate(length(max = 2000))]
    pub client_notes: Option<String>,
}

/// A requested line with its pricing resolved, ready to persist
#[derive(Debug, Clone)]
pub struct PricedLine {
    pub equipment_id: i32,
    pub quantity: i32,
    pub price_per_day: Decimal,
    pub total_price: Decimal,
}

/// Query parameters for listing reservations
#[derive(Debug, Deserialize, IntoParams)]
pub struct ReservationQuery {
    /// Filter by status slug (pending, approved, ...)
    pub status: Option<String>,
    /// Filter by owning user (admin only)
    pub user_id: Option<i32>,
    /// Include soft-deleted records (admin only)
    pub include_deleted: Option<bool>,
}

/// Billed rental duration in days, inclusive of both endpoint days.
pub fn rental_duration(start: NaiveDate, end: NaiveDate) -> i32 {
    ((end - start).num_days() + 1) as i32
}

/// Price of one line over the rental period.
pub fn line_total(price_per_day: Decimal, quantity: i32, duration: i32) -> Decimal {
    price_per_day * Decimal::from(quantity) * Decimal::from(duration)
}

/// Deposit charged on top of the subtotal, rounded to cents.
pub fn compute_deposit(subtotal: Decimal) -> Decimal {
    (subtotal * DEPOSIT_RATE).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn duration_is_inclusive_of_both_days() {
        assert_eq!(rental_duration(d("2025-06-01"), d("2025-06-05")), 5);
        assert_eq!(rental_duration(d("2025-06-01"), d("2025-06-02")), 2);
    }

    #[test]
    fn line_total_multiplies_price_quantity_duration() {
        let price = Decimal::new(12_50, 2); // 12.50
        assert_eq!(line_total(price, 2, 3), Decimal::new(75_00, 2));
    }

    #[test]
    fn deposit_is_twenty_percent_rounded_to_cents() {
        assert_eq!(compute_deposit(Decimal::new(100_00, 2)), Decimal::new(20_00, 2));
        // 0.2 * 10.33 = 2.066 -> 2.07 (midpoint away from zero)
        assert_eq!(compute_deposit(Decimal::new(10_33, 2)), Decimal::new(2_07, 2));
        assert_eq!(compute_deposit(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn pricing_summary_adds_up() {
        let subtotal = Decimal::new(123_45, 2);
        let deposit = compute_deposit(subtotal);
        let total = subtotal + deposit;
        assert_eq!(total, subtotal + deposit);
        assert_eq!(deposit, Decimal::new(24_69, 2));
    }
}
