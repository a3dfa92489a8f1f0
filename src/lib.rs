//! Alexandria Library Inventory & Circulation Server
//!
//! A Rust REST server tracking physical copies of catalog items and their
//! lending lifecycle, keeping per-item availability counters transactionally
//! consistent with copy-level state under concurrent access.

use std::sync::Arc;

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
