//! Catalog item management service

use crate::{
    error::AppResult,
    models::item::{CreateItem, Item, UpdateItem},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn create_item(&self, item: CreateItem) -> AppResult<Item> {
        self.repository.items.create(&item).await
    }

    pub async fn get_item(&self, id: i32) -> AppResult<Item> {
        self.repository.items.get_by_id(id).await
    }

    pub async fn list_items(&self) -> AppResult<Vec<Item>> {
        self.repository.items.list().await
    }

    pub async fn update_item(&self, id: i32, update: UpdateItem) -> AppResult<Item> {
        self.repository.items.update(id, &update).await
    }

    /// Delete an item; refused while copies are still provisioned
    pub async fn delete_item(&self, id: i32) -> AppResult<()> {
        self.repository.items.delete(id).await
    }
}
