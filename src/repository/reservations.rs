//! Reservation ledger repository

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::ReservationStatus,
        reservation::{
            PricedLine, Reservation, ReservationDetails, ReservationLine,
            ReservationLineDetails, ReservationQuery,
        },
    },
};

/// One commitment-holding line overlapping a queried date range
#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub struct OverlappingReservation {
    pub reservation_id: i32,
    pub number: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: i16,
    pub quantity: i32,
}

#[derive(Clone)]
pub struct ReservationsRepository {
    pool: Pool<Postgres>,
}

impl ReservationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Allocate the next display number for the current year.
    ///
    /// Uses an atomic per-year sequence row rather than a row count, so
    /// concurrent creates can never collide.
    async fn next_number(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        year: i32,
    ) -> AppResult<String> {
        let value: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO reservation_sequences (year, value)
            VALUES ($1, 1)
            ON CONFLICT (year) DO UPDATE SET value = reservation_sequences.value + 1
            RETURNING value
            "#,
        )
        .bind(year)
        .fetch_one(&mut **tx)
        .await?;
        Ok(format!("RES-{}-{:04}", year, value))
    }

    /// Persist a new pending reservation with its lines in one transaction.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        user_id: i32,
        start_date: NaiveDate,
        end_date: NaiveDate,
        duration: i32,
        subtotal: Decimal,
        deposit: Decimal,
        total: Decimal,
        lines: &[PricedLine],
        client_notes: Option<&str>,
    ) -> AppResult<Reservation> {
        let mut tx = self.pool.begin().await?;

        let number = self.next_number(&mut tx, Utc::now().year()).await?;

        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservations
                (number, user_id, start_date, end_date, duration, status,
                 subtotal, deposit, total, client_notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(&number)
        .bind(user_id)
        .bind(start_date)
        .bind(end_date)
        .bind(duration)
        .bind(i16::from(ReservationStatus::Pending))
        .bind(subtotal)
        .bind(deposit)
        .bind(total)
        .bind(client_notes)
        .fetch_one(&mut *tx)
        .await?;

        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO reservation_lines
                    (reservation_id, equipment_id, quantity, price_per_day, total_price)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(reservation.id)
            .bind(line.equipment_id)
            .bind(line.quantity)
            .bind(line.price_per_day)
            .bind(line.total_price)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(reservation)
    }

    /// Get reservation by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation {} not found", id)))
    }

    /// Lock a reservation row for the duration of a transaction
    pub async fn get_for_update(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        id: i32,
    ) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation {} not found", id)))
    }

    /// Get the equipment lines of a reservation
    pub async fn get_lines<'e, E>(&self, executor: E, reservation_id: i32) -> AppResult<Vec<ReservationLine>>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let lines = sqlx::query_as::<_, ReservationLine>(
            "SELECT * FROM reservation_lines WHERE reservation_id = $1 ORDER BY id",
        )
        .bind(reservation_id)
        .fetch_all(executor)
        .await?;
        Ok(lines)
    }

    /// Get a reservation with its lines and equipment names
    pub async fn get_details(&self, id: i32) -> AppResult<ReservationDetails> {
        let reservation = self.get_by_id(id).await?;
        let lines = sqlx::query_as::<_, ReservationLineDetails>(
            r#"
            SELECT rl.equipment_id, e.name AS equipment_name, rl.quantity,
                   rl.price_per_day, rl.total_price
            FROM reservation_lines rl
            JOIN equipment e ON e.id = rl.equipment_id
            WHERE rl.reservation_id = $1
            ORDER BY rl.id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ReservationDetails { reservation, lines })
    }

    /// List reservations, optionally restricted to one user
    pub async fn list(
        &self,
        query: &ReservationQuery,
        restrict_user: Option<i32>,
        include_deleted: bool,
    ) -> AppResult<Vec<Reservation>> {
        let status: Option<i16> = match &query.status {
            Some(s) => Some(i16::from(
                s.parse::<ReservationStatus>()
                    .map_err(AppError::Validation)?,
            )),
            None => None,
        };
        let user_id = restrict_user.or(query.user_id);

        let rows = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT * FROM reservations
            WHERE ($1::smallint IS NULL OR status = $1)
              AND ($2::int IS NULL OR user_id = $2)
              AND ($3 OR is_deleted = FALSE)
            ORDER BY crea_date DESC
            "#,
        )
        .bind(status)
        .bind(user_id)
        .bind(include_deleted)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Sum the quantities of commitment-holding lines on an equipment whose
    /// date range overlaps `[start, end)` (half-open: touching boundaries do
    /// not overlap). `exclude` lets a transition ignore its own record.
    pub async fn committed_quantity<'e, E>(
        &self,
        executor: E,
        equipment_id: i32,
        start: NaiveDate,
        end: NaiveDate,
        exclude: Option<i32>,
    ) -> AppResult<i32>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let committed: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(rl.quantity), 0)::bigint
            FROM reservation_lines rl
            JOIN reservations r ON r.id = rl.reservation_id
            WHERE rl.equipment_id = $1
              AND r.status IN (1, 2)
              AND r.start_date < $3
              AND r.end_date > $2
              AND ($4::int IS NULL OR r.id <> $4)
            "#,
        )
        .bind(equipment_id)
        .bind(start)
        .bind(end)
        .bind(exclude)
        .fetch_one(executor)
        .await?;
        Ok(committed as i32)
    }

    /// List the commitment-holding reservations overlapping `[start, end)`
    /// on an equipment, with the committed quantity per reservation.
    pub async fn overlapping_reservations(
        &self,
        equipment_id: i32,
        start: NaiveDate,
        end: NaiveDate,
        exclude: Option<i32>,
    ) -> AppResult<Vec<OverlappingReservation>> {
        let rows = sqlx::query(
            r#"
            SELECT r.id, r.number, r.start_date, r.end_date, r.status, rl.quantity
            FROM reservation_lines rl
            JOIN reservations r ON r.id = rl.reservation_id
            WHERE rl.equipment_id = $1
              AND r.status IN (1, 2)
              AND r.start_date < $3
              AND r.end_date > $2
              AND ($4::int IS NULL OR r.id <> $4)
            ORDER BY r.start_date
            "#,
        )
        .bind(equipment_id)
        .bind(start)
        .bind(end)
        .bind(exclude)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| OverlappingReservation {
                reservation_id: row.get("id"),
                number: row.get("number"),
                start_date: row.get("start_date"),
                end_date: row.get("end_date"),
                status: row.get("status"),
                quantity: row.get("quantity"),
            })
            .collect())
    }

    /// Set a reservation status and stamp the matching transition timestamp.
    pub async fn set_status<'e, E>(
        &self,
        executor: E,
        id: i32,
        status: ReservationStatus,
    ) -> AppResult<()>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let stamp_col = match status {
            ReservationStatus::Approved => Some("approved_at"),
            ReservationStatus::Active => Some("activated_at"),
            ReservationStatus::Completed => Some("completed_at"),
            ReservationStatus::Cancelled => Some("cancelled_at"),
            ReservationStatus::Expired => Some("expired_at"),
            ReservationStatus::Pending | ReservationStatus::Rejected => None,
        };

        let query = match stamp_col {
            Some(col) => format!(
                "UPDATE reservations SET status = $1, {} = NOW(), modif_date = NOW() WHERE id = $2",
                col
            ),
            None => "UPDATE reservations SET status = $1, modif_date = NOW() WHERE id = $2"
                .to_string(),
        };

        let result = sqlx::query(&query)
            .bind(i16::from(status))
            .bind(id)
            .execute(executor)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Reservation {} not found", id)));
        }
        Ok(())
    }

    /// Reject a reservation with the mandatory reason
    pub async fn set_rejection<'e, E>(&self, executor: E, id: i32, reason: &str) -> AppResult<()>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE reservations
            SET status = $1, rejection_reason = $2, modif_date = NOW()
            WHERE id = $3
            "#,
        )
        .bind(i16::from(ReservationStatus::Rejected))
        .bind(reason)
        .bind(id)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Store admin notes on a reservation
    pub async fn set_admin_notes<'e, E>(&self, executor: E, id: i32, notes: &str) -> AppResult<()>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE reservations SET admin_notes = $1, modif_date = NOW() WHERE id = $2")
            .bind(notes)
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Soft-delete a reservation, recording the cause
    pub async fn soft_delete<'e, E>(&self, executor: E, id: i32, reason: &str) -> AppResult<()>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE reservations
            SET is_deleted = TRUE, deleted_at = NOW(), deletion_reason = $1, modif_date = NOW()
            WHERE id = $2
            "#,
        )
        .bind(reason)
        .bind(id)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Commitment-holding reservations whose rental period is over
    /// (expire pass input). Already-expired records never match: `expired`
    /// is not commitment-holding, which makes the pass idempotent.
    pub async fn find_expirable(&self, today: NaiveDate) -> AppResult<Vec<i32>> {
        let ids: Vec<i32> = sqlx::query_scalar(
            "SELECT id FROM reservations WHERE status IN (1, 2) AND end_date <= $1 ORDER BY id",
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Soft-delete terminal non-completed reservations last touched before
    /// the retention cutoff (cleanup pass). Returns the affected ids.
    pub async fn cleanup_terminal(&self, cutoff: chrono::DateTime<Utc>) -> AppResult<Vec<i32>> {
        let ids: Vec<i32> = sqlx::query_scalar(
            r#"
            UPDATE reservations
            SET is_deleted = TRUE, deleted_at = NOW(),
                deletion_reason = 'retention_cleanup', modif_date = NOW()
            WHERE status IN (4, 5, 6)
              AND is_deleted = FALSE
              AND COALESCE(modif_date, crea_date) < $1
            RETURNING id
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Ids of a user's reservations currently in any of the given statuses
    /// (cascade handler input)
    pub async fn user_reservations_in(
        &self,
        user_id: i32,
        statuses: &[ReservationStatus],
    ) -> AppResult<Vec<i32>> {
        let codes: Vec<i16> = statuses.iter().map(|s| i16::from(*s)).collect();
        let ids: Vec<i32> = sqlx::query_scalar(
            "SELECT id FROM reservations WHERE user_id = $1 AND status = ANY($2) ORDER BY id",
        )
        .bind(user_id)
        .bind(codes)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Count non-terminal reservations referencing an equipment
    /// (deletion guard)
    pub async fn count_open_for_equipment(&self, equipment_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT r.id)
            FROM reservation_lines rl
            JOIN reservations r ON r.id = rl.reservation_id
            WHERE rl.equipment_id = $1 AND r.status IN (0, 1, 2)
            "#,
        )
        .bind(equipment_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
