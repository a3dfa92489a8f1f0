//! Catalog item model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Catalog item from database.
///
/// `total_copies` and `available_copies` are aggregate counters maintained in
/// the same transaction as every copy mutation; `available_copies` always
/// equals the live count of the item's copies in Available status.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Item {
    pub id: i32,
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create item request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateItem {
    #[validate(length(min = 1, max = 512))]
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
}

/// Update item request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateItem {
    #[validate(length(min = 1, max = 512))]
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
}

/// Per-item inventory snapshot.
///
/// `issued_copies` is derived from open lending records at read time, never
/// stored, so it cannot drift.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ItemStats {
    pub item_id: i32,
    pub total_copies: i32,
    pub available_copies: i32,
    pub issued_copies: i64,
}
