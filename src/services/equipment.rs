//! Equipment service

use crate::{
    error::{AppError, AppResult},
    models::equipment::{CreateEquipment, Equipment, UpdateEquipment},
    repository::Repository,
};

#[derive(Clone)]
pub struct EquipmentService {
    repository: Repository,
}

impl EquipmentService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> AppResult<Vec<Equipment>> {
        self.repository.equipment.list().await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Equipment> {
        self.repository.equipment.get_by_id(id).await
    }

    pub async fn create(&self, data: &CreateEquipment) -> AppResult<Equipment> {
        if data.quantity < 1 {
            return Err(AppError::Validation("quantity must be positive".to_string()));
        }
        self.repository.equipment.create(data).await
    }

    /// Update metadata. When the total quantity changes, the availability
    /// projection is resynced so `available` stays within bounds.
    pub async fn update(&self, id: i32, data: &UpdateEquipment) -> AppResult<Equipment> {
        if matches!(data.quantity, Some(q) if q < 1) {
            return Err(AppError::Validation("quantity must be positive".to_string()));
        }
        let equipment = self.repository.equipment.update(id, data).await?;
        if data.quantity.is_some() || data.status.is_some() {
            let today = chrono::Utc::now().date_naive();
            self.repository
                .equipment
                .sync_available(&self.repository.pool, id, today)
                .await?;
            return self.repository.equipment.get_by_id(id).await;
        }
        Ok(equipment)
    }

    /// Delete equipment; refused while any non-terminal reservation still
    /// references it.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let open = self.repository.reservations.count_open_for_equipment(id).await?;
        if open > 0 {
            return Err(AppError::Conflict(format!(
                "Equipment {} is referenced by {} open reservation(s)",
                id, open
            )));
        }
        match self.repository.equipment.delete(id).await {
            // Foreign key from historic reservation lines: the ledger is
            // never purged, so equipment with rental history is retired,
            // not deleted.
            Err(AppError::Database(sqlx::Error::Database(e)))
                if e.code().as_deref() == Some("23503") =>
            {
                Err(AppError::Conflict(format!(
                    "Equipment {} has rental history; set it to retired instead",
                    id
                )))
            }
            other => other,
        }
    }
}
