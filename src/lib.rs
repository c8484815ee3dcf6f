//! CineRent Equipment Rental Management System
//!
//! A Rust implementation of the CineRent rental backend, providing a REST
//! JSON API for managing a cinema equipment catalog, clients and the
//! reservation lifecycle.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod scheduler;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
