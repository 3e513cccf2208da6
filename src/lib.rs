//! OAM - Organization Asset Management
//!
//! A REST JSON API server tracking the lifecycle of organizational assets:
//! assets move between availability states, get assigned to staff members,
//! and come back through return requests. All writes go through optimistic
//! version checks.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
    pub store: Arc<dyn store::Store>,
}
