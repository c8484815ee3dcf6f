//! Business logic services

pub mod availability;
pub mod cascade;
pub mod equipment;
pub mod reconciliation;
pub mod reservations;
pub mod users;

use crate::{config::{AuthConfig, SweepConfig}, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub equipment: equipment::EquipmentService,
    pub availability: availability::AvailabilityService,
    pub reservations: reservations::ReservationsService,
    pub reconciliation: reconciliation::ReconciliationService,
    pub cascade: cascade::CascadeService,
    pub users: users::UsersService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, auth_config: AuthConfig, sweep_config: SweepConfig) -> Self {
        let reservations = reservations::ReservationsService::new(repository.clone());
        let cascade = cascade::CascadeService::new(repository.clone(), reservations.clone());
        Self {
            equipment: equipment::EquipmentService::new(repository.clone()),
            availability: availability::AvailabilityService::new(repository.clone()),
            reconciliation: reconciliation::ReconciliationService::new(
                repository.clone(),
                reservations.clone(),
                sweep_config,
            ),
            users: users::UsersService::new(repository.clone(), cascade.clone(), auth_config),
            cascade,
            reservations,
        }
    }
}
