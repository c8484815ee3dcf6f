//! Domain models

pub mod enums;
pub mod equipment;
pub mod reservation;
pub mod user;
