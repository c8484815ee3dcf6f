//! Equipment model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Equipment record (a rentable item type, not a serialized unit)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Equipment {
    pub id: i32,
    /// Equipment name / description
    pub name: String,
    /// Category (0=camera, 1=lighting, 2=sound, 3=stabilizer, 4=drone,
    /// 5=monitor, 6=accessory, 7=other)
    pub category: i16,
    pub description: Option<String>,
    /// Total units owned
    pub quantity: i32,
    /// Units not currently committed; a cached projection of the
    /// reservation ledger, only mutated through
    /// `EquipmentRepository::sync_available`
    pub available: i32,
    /// Status (0=available, 1=rented, 2=maintenance, 3=retired)
    pub status: i16,
    pub price_per_day: Decimal,
    pub notes: Option<String>,
    pub crea_date: Option<DateTime<Utc>>,
    pub modif_date: Option<DateTime<Utc>>,
}

/// Create equipment request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEquipment {
    pub name: String,
    pub category: Option<i16>,
    pub description: Option<String>,
    pub quantity: i32,
    pub price_per_day: Decimal,
    pub notes: Option<String>,
}

/// Update equipment request (metadata only; `available` is owned by the
/// reservation subsystem and never written through this path)
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateEquipment {
    pub name: Option<String>,
    pub category: Option<i16>,
    pub description: Option<String>,
    pub quantity: Option<i32>,
    pub status: Option<i16>,
    pub price_per_day: Option<Decimal>,
    pub notes: Option<String>,
}
