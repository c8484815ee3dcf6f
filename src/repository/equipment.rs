//! Equipment repository for database operations

use chrono::{NaiveDate, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::equipment::{CreateEquipment, Equipment, UpdateEquipment},
};

/// A stored `available` value that disagrees with the ledger projection.
#[derive(Debug, Clone)]
pub struct AvailabilityDrift {
    pub equipment_id: i32,
    pub name: String,
    pub stored: i32,
    pub computed: i32,
}

#[derive(Clone)]
pub struct EquipmentRepository {
    pool: Pool<Postgres>,
}

impl EquipmentRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List all equipment
    pub async fn list(&self) -> AppResult<Vec<Equipment>> {
        let rows = sqlx::query_as::<_, Equipment>("SELECT * FROM equipment ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Get equipment by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Equipment> {
        sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Lock a set of equipment rows for the duration of a transaction.
    /// Rows come back ordered by id so concurrent callers acquire locks in
    /// the same order.
    pub async fn get_many_for_update(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        ids: &[i32],
    ) -> AppResult<Vec<Equipment>> {
        let rows = sqlx::query_as::<_, Equipment>(
            "SELECT * FROM equipment WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(ids)
        .fetch_all(&mut **tx)
        .await?;
        Ok(rows)
    }

    /// Create equipment; initial `available` equals `quantity`
    pub async fn create(&self, data: &CreateEquipment) -> AppResult<Equipment> {
        let row = sqlx::query_as::<_, Equipment>(
            r#"
            INSERT INTO equipment (name, category, description, quantity, available, price_per_day, notes)
            VALUES ($1, $2, $3, $4, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(data.category.unwrap_or(7))
        .bind(&data.description)
        .bind(data.quantity)
        .bind(data.price_per_day)
        .bind(&data.notes)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Update equipment metadata
    pub async fn update(&self, id: i32, data: &UpdateEquipment) -> AppResult<Equipment> {
        let now = Utc::now();
        let mut sets = vec!["modif_date = $1".to_string()];
        let mut idx = 2;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, idx));
                    idx += 1;
                }
            };
        }

        add_field!(data.name, "name");
        add_field!(data.category, "category");
        add_field!(data.description, "description");
        if data.quantity.is_some() {
            // Shrinking stock must clamp the projection in the same
            // statement, or the available <= quantity check fires before
            // the resync gets a chance to run.
            sets.push(format!(
                "quantity = ${}, available = LEAST(available, ${})",
                idx, idx
            ));
            idx += 1;
        }
        add_field!(data.status, "status");
        add_field!(data.price_per_day, "price_per_day");
        add_field!(data.notes, "notes");

        let query = format!(
            "UPDATE equipment SET {} WHERE id = {} RETURNING *",
            sets.join(", "),
            id
        );

        let mut builder = sqlx::query_as::<_, Equipment>(&query).bind(now);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.name);
        bind_field!(data.category);
        bind_field!(data.description);
        bind_field!(data.quantity);
        bind_field!(data.status);
        bind_field!(data.price_per_day);
        bind_field!(data.notes);

        builder
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Delete equipment
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM equipment WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Equipment {} not found", id)));
        }
        Ok(())
    }

    /// Recompute the cached `available` projection from the reservation
    /// ledger and refresh the advisory status, all in one statement.
    ///
    /// This is the only write path for `available`: every capacity-affecting
    /// transition and the reconciliation sweep go through it. The projection
    /// counts commitment-holding reservations (approved, active) whose date
    /// range covers `on_date`, clamped to `0..=quantity`. Maintenance and
    /// retired statuses are administrative and left untouched.
    pub async fn sync_available<'e, E>(
        &self,
        executor: E,
        equipment_id: i32,
        on_date: NaiveDate,
    ) -> AppResult<i32>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let available: i32 = sqlx::query_scalar(
            r#"
            WITH committed AS (
                SELECT COALESCE(SUM(rl.quantity), 0)::int AS qty
                FROM reservation_lines rl
                JOIN reservations r ON r.id = rl.reservation_id
                WHERE rl.equipment_id = $1
                  AND r.status IN (1, 2)
                  AND r.start_date <= $2
                  AND r.end_date > $2
            )
            UPDATE equipment e SET
                available = GREATEST(0, LEAST(e.quantity, e.quantity - committed.qty)),
                status = CASE
                    WHEN e.status IN (2, 3) THEN e.status
                    WHEN e.quantity - committed.qty <= 0 THEN 1
                    ELSE 0
                END,
                modif_date = NOW()
            FROM committed
            WHERE e.id = $1
            RETURNING e.available
            "#,
        )
        .bind(equipment_id)
        .bind(on_date)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", equipment_id)))?;
        Ok(available)
    }

    /// Find equipment whose stored `available` disagrees with the ledger
    /// projection for `on_date` (consistency pass input).
    pub async fn find_drifted(&self, on_date: NaiveDate) -> AppResult<Vec<AvailabilityDrift>> {
        let rows = sqlx::query_as::<_, (i32, String, i32, i32)>(
            r#"
            SELECT id, name, stored, computed FROM (
                SELECT e.id, e.name, e.available AS stored,
                       GREATEST(0, LEAST(e.quantity, e.quantity - COALESCE(c.qty, 0))) AS computed
                FROM equipment e
                LEFT JOIN (
                    SELECT rl.equipment_id, SUM(rl.quantity)::int AS qty
                    FROM reservation_lines rl
                    JOIN reservations r ON r.id = rl.reservation_id
                    WHERE r.status IN (1, 2)
                      AND r.start_date <= $1
                      AND r.end_date > $1
                    GROUP BY rl.equipment_id
                ) c ON c.equipment_id = e.id
            ) p
            WHERE p.stored <> p.computed
            ORDER BY p.id
            "#,
        )
        .bind(on_date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(equipment_id, name, stored, computed)| AvailabilityDrift {
                equipment_id,
                name,
                stored,
                computed,
            })
            .collect())
    }
}
