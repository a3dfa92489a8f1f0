//! Business logic services

pub mod catalog;
pub mod inventory;
pub mod lending;
pub mod users;

use std::sync::Arc;

use crate::{clock::Clock, config::LendingConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub inventory: inventory::InventoryService,
    pub lending: lending::LendingService,
    pub users: users::UsersService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        lending_config: LendingConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            inventory: inventory::InventoryService::new(repository.clone(), clock.clone()),
            lending: lending::LendingService::new(repository.clone(), lending_config, clock),
            users: users::UsersService::new(repository),
        }
    }
}
