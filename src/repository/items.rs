//! Catalog items repository for database operations

use chrono::Utc;
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        item::{CreateItem, Item, ItemStats, UpdateItem},
        lending::LendingStatus,
    },
};

/// Inventory snapshot for an item, usable inside or outside a transaction.
///
/// `issued_copies` is counted from open lending records at read time; the
/// stored counters come straight from the item row.
pub(crate) async fn item_stats(conn: &mut PgConnection, item_id: i32) -> AppResult<ItemStats> {
    sqlx::query_as::<_, ItemStats>(
        r#"
        SELECT i.id as item_id, i.total_copies, i.available_copies,
               (SELECT COUNT(*) FROM lendings l
                WHERE l.item_id = i.id AND l.status IN ($2, $3)) as issued_copies
        FROM items i
        WHERE i.id = $1
        "#,
    )
    .bind(item_id)
    .bind(LendingStatus::Issued)
    .bind(LendingStatus::Overdue)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", item_id)))
}

#[derive(Clone)]
pub struct ItemsRepository {
    pool: Pool<Postgres>,
}

impl ItemsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get item by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Item> {
        sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))
    }

    /// List all items
    pub async fn list(&self) -> AppResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>("SELECT * FROM items ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Create a catalog item with zero copies
    pub async fn create(&self, item: &CreateItem) -> AppResult<Item> {
        let now = Utc::now();

        let created = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (title, author, isbn, total_copies, available_copies, created_at, updated_at)
            VALUES ($1, $2, $3, 0, 0, $4, $4)
            RETURNING *
            "#,
        )
        .bind(&item.title)
        .bind(&item.author)
        .bind(&item.isbn)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Update item bibliographic fields (counters are never settable here)
    pub async fn update(&self, id: i32, update: &UpdateItem) -> AppResult<Item> {
        let now = Utc::now();

        sqlx::query_as::<_, Item>(
            r#"
            UPDATE items
            SET title = COALESCE($2, title),
                author = COALESCE($3, author),
                isbn = COALESCE($4, isbn),
                updated_at = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.title)
        .bind(&update.author)
        .bind(&update.isbn)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))
    }

    /// Delete an item. The item owns its copies, so deletion is refused while
    /// any copy is still provisioned.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let total: Option<i32> =
            sqlx::query_scalar("SELECT total_copies FROM items WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        match total {
            None => return Err(AppError::NotFound(format!("Item with id {} not found", id))),
            Some(n) if n > 0 => {
                return Err(AppError::PreconditionFailed(format!(
                    "Item {} still has {} provisioned copies",
                    id, n
                )))
            }
            Some(_) => {}
        }

        sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Get the inventory snapshot for an item
    pub async fn get_stats(&self, id: i32) -> AppResult<ItemStats> {
        let mut conn = self.pool.acquire().await?;
        item_stats(&mut *conn, id).await
    }
}
