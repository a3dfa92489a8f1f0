//! Copies repository: the copy store and the bulk inventory mutators.
//!
//! Both mutators run as a single transaction that locks the owning item row
//! before touching any copy, so the aggregate counters and the copy rows can
//! never be observed out of sync. Lock order across the codebase is
//! lendings → items → copies.

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        copy::{Copy, CopyStatus},
        item::ItemStats,
    },
    repository::items::item_stats,
};

#[derive(Clone)]
pub struct CopiesRepository {
    pool: Pool<Postgres>,
}

impl CopiesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get copy by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Copy> {
        sqlx::query_as::<_, Copy>("SELECT * FROM copies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Copy with id {} not found", id)))
    }

    /// List an item's copies in creation order
    pub async fn list_by_item(&self, item_id: i32) -> AppResult<Vec<Copy>> {
        let copies = sqlx::query_as::<_, Copy>(
            "SELECT * FROM copies WHERE item_id = $1 ORDER BY id",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(copies)
    }

    /// Provision `count` new available copies and bump both aggregate
    /// counters by `count` in the same transaction.
    pub async fn add_batch(
        &self,
        item_id: i32,
        count: i32,
        now: DateTime<Utc>,
    ) -> AppResult<ItemStats> {
        let mut tx = self.pool.begin().await?;

        // Lock the aggregate row for the whole mutation
        let exists: Option<i32> =
            sqlx::query_scalar("SELECT id FROM items WHERE id = $1 FOR UPDATE")
                .bind(item_id)
                .fetch_optional(&mut *tx)
                .await?;

        if exists.is_none() {
            return Err(AppError::NotFound(format!(
                "Item with id {} not found",
                item_id
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO copies (item_id, status, created_at, updated_at)
            SELECT $1, $2, $3, $3 FROM generate_series(1, $4)
            "#,
        )
        .bind(item_id)
        .bind(CopyStatus::Available)
        .bind(now)
        .bind(count)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE items
            SET total_copies = total_copies + $2,
                available_copies = available_copies + $2,
                updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(item_id)
        .bind(count)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let stats = item_stats(&mut *tx, item_id).await?;
        tx.commit().await?;

        Ok(stats)
    }

    /// Withdraw `count` available copies, oldest first, and decrement both
    /// aggregate counters by `count` in the same transaction. Only copies in
    /// Available status are eligible; issued or lost copies are never taken.
    pub async fn remove_batch(
        &self,
        item_id: i32,
        count: i32,
        now: DateTime<Utc>,
    ) -> AppResult<ItemStats> {
        let mut tx = self.pool.begin().await?;

        let available: Option<i32> =
            sqlx::query_scalar("SELECT available_copies FROM items WHERE id = $1 FOR UPDATE")
                .bind(item_id)
                .fetch_optional(&mut *tx)
                .await?;

        let available = available.ok_or_else(|| {
            AppError::NotFound(format!("Item with id {} not found", item_id))
        })?;

        if count > available {
            return Err(AppError::InsufficientAvailable(format!(
                "Requested removal of {} copies but only {} are available",
                count, available
            )));
        }

        let deleted = sqlx::query(
            r#"
            DELETE FROM copies
            WHERE id IN (
                SELECT id FROM copies
                WHERE item_id = $1 AND status = $2
                ORDER BY id
                LIMIT $3
            )
            "#,
        )
        .bind(item_id)
        .bind(CopyStatus::Available)
        .bind(count as i64)
        .execute(&mut *tx)
        .await?;

        if deleted.rows_affected() != count as u64 {
            // Counter said enough copies were available but the rows disagree
            return Err(AppError::Internal(format!(
                "Copy rows out of sync with counters for item {}",
                item_id
            )));
        }

        let updated = sqlx::query(
            r#"
            UPDATE items
            SET total_copies = total_copies - $2,
                available_copies = available_copies - $2,
                updated_at = $3
            WHERE id = $1 AND available_copies >= $2
            "#,
        )
        .bind(item_id)
        .bind(count)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::Internal(format!(
                "Aggregate counters out of sync for item {}",
                item_id
            )));
        }

        let stats = item_stats(&mut *tx, item_id).await?;
        tx.commit().await?;

        Ok(stats)
    }
}
