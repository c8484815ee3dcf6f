//! Shared domain enums

use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, Postgres};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// ReservationStatus
// ---------------------------------------------------------------------------

/// Reservation lifecycle status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum ReservationStatus {
    Pending = 0,
    Approved = 1,
    Active = 2,
    Completed = 3,
    Rejected = 4,
    Cancelled = 5,
    Expired = 6,
}

impl ReservationStatus {
    /// Statuses whose equipment quantities count against availability
    /// for other requests. `completed` never holds capacity.
    pub fn holds_capacity(self) -> bool {
        matches!(self, ReservationStatus::Approved | ReservationStatus::Active)
    }

    /// Terminal statuses have no outbound transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ReservationStatus::Completed
                | ReservationStatus::Rejected
                | ReservationStatus::Cancelled
                | ReservationStatus::Expired
        )
    }

    /// The canonical transition table.
    pub fn can_transition_to(self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (Approved, Active)
                | (Approved, Completed)
                | (Approved, Cancelled)
                | (Approved, Expired)
                | (Active, Completed)
                | (Active, Cancelled)
                | (Active, Expired)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Approved => "approved",
            ReservationStatus::Active => "active",
            ReservationStatus::Completed => "completed",
            ReservationStatus::Rejected => "rejected",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Expired => "expired",
        }
    }
}

impl From<i16> for ReservationStatus {
    fn from(v: i16) -> Self {
        match v {
            1 => ReservationStatus::Approved,
            2 => ReservationStatus::Active,
            3 => ReservationStatus::Completed,
            4 => ReservationStatus::Rejected,
            5 => ReservationStatus::Cancelled,
            6 => ReservationStatus::Expired,
            _ => ReservationStatus::Pending,
        }
    }
}

impl From<ReservationStatus> for i16 {
    fn from(s: ReservationStatus) -> Self {
        s as i16
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ReservationStatus::Pending),
            "approved" => Ok(ReservationStatus::Approved),
            "active" => Ok(ReservationStatus::Active),
            "completed" => Ok(ReservationStatus::Completed),
            "rejected" => Ok(ReservationStatus::Rejected),
            "cancelled" => Ok(ReservationStatus::Cancelled),
            "expired" => Ok(ReservationStatus::Expired),
            _ => Err(format!("Invalid reservation status: {}", s)),
        }
    }
}

// ---------------------------------------------------------------------------
// EquipmentCategory
// ---------------------------------------------------------------------------

/// Equipment category codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum EquipmentCategory {
    Camera = 0,
    Lighting = 1,
    Sound = 2,
    Stabilizer = 3,
    Drone = 4,
    Monitor = 5,
    Accessory = 6,
    Other = 7,
}

impl From<i16> for EquipmentCategory {
    fn from(v: i16) -> Self {
        match v {
            0 => EquipmentCategory::Camera,
            1 => EquipmentCategory::Lighting,
            2 => EquipmentCategory::Sound,
            3 => EquipmentCategory::Stabilizer,
            4 => EquipmentCategory::Drone,
            5 => EquipmentCategory::Monitor,
            6 => EquipmentCategory::Accessory,
            _ => EquipmentCategory::Other,
        }
    }
}

impl From<EquipmentCategory> for i16 {
    fn from(c: EquipmentCategory) -> Self {
        c as i16
    }
}

impl std::fmt::Display for EquipmentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EquipmentCategory::Camera => "Camera",
            EquipmentCategory::Lighting => "Lighting",
            EquipmentCategory::Sound => "Sound",
            EquipmentCategory::Stabilizer => "Stabilizer",
            EquipmentCategory::Drone => "Drone",
            EquipmentCategory::Monitor => "Monitor",
            EquipmentCategory::Accessory => "Accessory",
            EquipmentCategory::Other => "Other",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// EquipmentStatus
// ---------------------------------------------------------------------------

/// Equipment operational status codes.
///
/// `Available`/`Rented` are recomputed from the availability projection;
/// `Maintenance`/`Retired` are administrative overrides that the
/// projection never touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum EquipmentStatus {
    Available = 0,
    Rented = 1,
    Maintenance = 2,
    Retired = 3,
}

impl EquipmentStatus {
    /// Whether new reservations may be taken against this equipment.
    pub fn is_operational(self) -> bool {
        matches!(self, EquipmentStatus::Available | EquipmentStatus::Rented)
    }
}

impl From<i16> for EquipmentStatus {
    fn from(v: i16) -> Self {
        match v {
            1 => EquipmentStatus::Rented,
            2 => EquipmentStatus::Maintenance,
            3 => EquipmentStatus::Retired,
            _ => EquipmentStatus::Available,
        }
    }
}

impl From<EquipmentStatus> for i16 {
    fn from(s: EquipmentStatus) -> Self {
        s as i16
    }
}

impl std::fmt::Display for EquipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EquipmentStatus::Available => "available",
            EquipmentStatus::Rented => "rented",
            EquipmentStatus::Maintenance => "maintenance",
            EquipmentStatus::Retired => "retired",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// User role (string slug in the database)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "client" => Ok(Role::Client),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

// SQLx conversion for Role
impl sqlx::Type<Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReservationStatus::*;

    #[test]
    fn terminal_statuses_have_no_outbound_transitions() {
        let all = [Pending, Approved, Active, Completed, Rejected, Cancelled, Expired];
        for from in all.into_iter().filter(|s| s.is_terminal()) {
            for to in all {
                assert!(
                    !from.can_transition_to(to),
                    "{} -> {} should be rejected",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn pending_transitions() {
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Active));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Expired));
    }

    #[test]
    fn approved_transitions() {
        assert!(Approved.can_transition_to(Active));
        assert!(Approved.can_transition_to(Completed));
        assert!(Approved.can_transition_to(Cancelled));
        assert!(Approved.can_transition_to(Expired));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Approved.can_transition_to(Pending));
    }

    #[test]
    fn only_approved_and_active_hold_capacity() {
        let all = [Pending, Approved, Active, Completed, Rejected, Cancelled, Expired];
        for s in all {
            assert_eq!(s.holds_capacity(), matches!(s, Approved | Active), "{}", s);
        }
    }

    #[test]
    fn status_roundtrips_through_i16() {
        let all = [Pending, Approved, Active, Completed, Rejected, Cancelled, Expired];
        for s in all {
            assert_eq!(ReservationStatus::from(i16::from(s)), s);
        }
    }
}
