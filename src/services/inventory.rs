//! Inventory mutation service: bulk provisioning and withdrawal of copies

use std::sync::Arc;

use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::{copy::Copy, item::ItemStats},
    repository::Repository,
};

/// Upper bound on a single provisioning batch.
pub const MAX_COPIES_PER_BATCH: i32 = 100;

#[derive(Clone)]
pub struct InventoryService {
    repository: Repository,
    clock: Arc<dyn Clock>,
}

impl InventoryService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Provision `count` new available copies for an item
    pub async fn add_copies(&self, item_id: i32, count: i32) -> AppResult<ItemStats> {
        if !(1..=MAX_COPIES_PER_BATCH).contains(&count) {
            return Err(AppError::InvalidArgument(format!(
                "count must be between 1 and {}, got {}",
                MAX_COPIES_PER_BATCH, count
            )));
        }

        let stats = self
            .repository
            .copies
            .add_batch(item_id, count, self.clock.now())
            .await?;

        tracing::info!(item_id, count, "provisioned copies");
        Ok(stats)
    }

    /// Withdraw `count` available copies from an item, oldest first
    pub async fn remove_copies(&self, item_id: i32, count: i32) -> AppResult<ItemStats> {
        if count < 1 {
            return Err(AppError::InvalidArgument(format!(
                "count must be at least 1, got {}",
                count
            )));
        }

        let stats = self
            .repository
            .copies
            .remove_batch(item_id, count, self.clock.now())
            .await?;

        tracing::info!(item_id, count, "withdrew copies");
        Ok(stats)
    }

    /// Inventory snapshot for an item
    pub async fn get_stats(&self, item_id: i32) -> AppResult<ItemStats> {
        self.repository.items.get_stats(item_id).await
    }

    /// List an item's copies
    pub async fn list_copies(&self, item_id: i32) -> AppResult<Vec<Copy>> {
        // Distinguish a missing item from an item with no copies
        self.repository.items.get_by_id(item_id).await?;
        self.repository.copies.list_by_item(item_id).await
    }
}
