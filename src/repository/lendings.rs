//! Lending records repository: the circulation state machine.
//!
//! Every transition that touches a copy and its item counters runs in one
//! transaction. Preconditions are enforced as guarded UPDATEs whose affected
//! row count is checked, so concurrent callers racing on the same copy or
//! record cannot both succeed. Lock order is lendings → items → copies.

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        copy::CopyStatus,
        lending::{LendingRecord, LendingStatus, ReturnReceipt},
    },
};

#[derive(Clone)]
pub struct LendingsRepository {
    pool: Pool<Postgres>,
}

impl LendingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get lending record by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<LendingRecord> {
        sqlx::query_as::<_, LendingRecord>("SELECT * FROM lendings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lending record with id {} not found", id)))
    }

    /// Issue a copy to a borrower.
    ///
    /// One transaction: lock the item row, check the aggregate has headroom,
    /// flip the copy Available→Issued (the WHERE clause is the precondition),
    /// decrement the counter, insert the record.
    pub async fn issue(
        &self,
        borrower_id: i32,
        copy_id: i32,
        now: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> AppResult<LendingRecord> {
        let mut tx = self.pool.begin().await?;

        let copy: Option<(i32, CopyStatus)> =
            sqlx::query_as("SELECT item_id, status FROM copies WHERE id = $1")
                .bind(copy_id)
                .fetch_optional(&mut *tx)
                .await?;

        let (item_id, _) = copy.ok_or_else(|| {
            AppError::NotFound(format!("Copy with id {} not found", copy_id))
        })?;

        let available: i32 =
            sqlx::query_scalar("SELECT available_copies FROM items WHERE id = $1 FOR UPDATE")
                .bind(item_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| {
                    AppError::Internal(format!("Item {} missing for copy {}", item_id, copy_id))
                })?;

        if available <= 0 {
            return Err(AppError::PreconditionFailed(format!(
                "Item {} has no available copies",
                item_id
            )));
        }

        let flipped = sqlx::query(
            "UPDATE copies SET status = $2, updated_at = $3 WHERE id = $1 AND status = $4",
        )
        .bind(copy_id)
        .bind(CopyStatus::Issued)
        .bind(now)
        .bind(CopyStatus::Available)
        .execute(&mut *tx)
        .await?;

        if flipped.rows_affected() == 0 {
            return Err(AppError::PreconditionFailed(format!(
                "Copy {} is not available",
                copy_id
            )));
        }

        let decremented = sqlx::query(
            r#"
            UPDATE items
            SET available_copies = available_copies - 1, updated_at = $2
            WHERE id = $1 AND available_copies > 0
            "#,
        )
        .bind(item_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if decremented.rows_affected() == 0 {
            return Err(AppError::PreconditionFailed(format!(
                "Item {} has no available copies",
                item_id
            )));
        }

        let record = sqlx::query_as::<_, LendingRecord>(
            r#"
            INSERT INTO lendings (borrower_id, copy_id, item_id, issue_date, due_date, status, renew_count)
            VALUES ($1, $2, $3, $4, $5, $6, 0)
            RETURNING *
            "#,
        )
        .bind(borrower_id)
        .bind(copy_id)
        .bind(item_id)
        .bind(now)
        .bind(due_date)
        .bind(LendingStatus::Issued)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    /// Close a lending record and put the copy back in circulation.
    ///
    /// The fine is a flat `fine_per_day` per full overdue day, assessed at
    /// return time from the record's due date.
    pub async fn return_loan(
        &self,
        id: i32,
        now: DateTime<Utc>,
        fine_per_day: i64,
    ) -> AppResult<ReturnReceipt> {
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, LendingRecord>(
            "SELECT * FROM lendings WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Lending record with id {} not found", id)))?;

        if record.status == LendingStatus::Returned {
            return Err(AppError::PreconditionFailed(format!(
                "Lending record {} is already returned",
                id
            )));
        }

        let overdue_days = overdue_days(record.due_date, now);
        let fine = overdue_days * fine_per_day;

        sqlx::query("SELECT id FROM items WHERE id = $1 FOR UPDATE")
            .bind(record.item_id)
            .execute(&mut *tx)
            .await?;

        let closed = sqlx::query_as::<_, LendingRecord>(
            r#"
            UPDATE lendings SET status = $2, return_date = $3 WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(LendingStatus::Returned)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let copy_flipped = sqlx::query(
            "UPDATE copies SET status = $2, updated_at = $3 WHERE id = $1 AND status = $4",
        )
        .bind(record.copy_id)
        .bind(CopyStatus::Available)
        .bind(now)
        .bind(CopyStatus::Issued)
        .execute(&mut *tx)
        .await?;

        if copy_flipped.rows_affected() == 0 {
            return Err(AppError::Internal(format!(
                "Copy {} was not in issued status while its record was open",
                record.copy_id
            )));
        }

        let incremented = sqlx::query(
            r#"
            UPDATE items
            SET available_copies = available_copies + 1, updated_at = $2
            WHERE id = $1 AND available_copies < total_copies
            "#,
        )
        .bind(record.item_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if incremented.rows_affected() == 0 {
            return Err(AppError::Internal(format!(
                "Aggregate counters out of sync for item {}",
                record.item_id
            )));
        }

        tx.commit().await?;

        Ok(ReturnReceipt {
            record: closed,
            overdue_days,
            fine,
        })
    }

    /// Extend an on-time loan once. Overdue records are not renewable, and a
    /// record can only ever be renewed a single time. Touches neither the
    /// copy nor the aggregate counters.
    pub async fn renew(
        &self,
        id: i32,
        extension_days: i64,
    ) -> AppResult<LendingRecord> {
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, LendingRecord>(
            "SELECT * FROM lendings WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Lending record with id {} not found", id)))?;

        if record.status != LendingStatus::Issued {
            return Err(AppError::PreconditionFailed(format!(
                "Lending record {} is not an on-time issued loan",
                id
            )));
        }

        if record.renew_count >= 1 {
            return Err(AppError::PreconditionFailed(format!(
                "Lending record {} has already been renewed",
                id
            )));
        }

        let new_due = record.due_date + chrono::Duration::days(extension_days);

        let renewed = sqlx::query_as::<_, LendingRecord>(
            r#"
            UPDATE lendings SET due_date = $2, renew_count = renew_count + 1 WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(new_due)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(renewed)
    }

    /// Reclassify every issued record past its due date as overdue.
    ///
    /// Returns the pre-transition snapshot, so an immediate second sweep
    /// returns an empty set: the records are Overdue by then, not Issued.
    pub async fn sweep_overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<LendingRecord>> {
        let mut tx = self.pool.begin().await?;

        let snapshot = sqlx::query_as::<_, LendingRecord>(
            r#"
            SELECT * FROM lendings
            WHERE status = $1 AND due_date < $2
            ORDER BY due_date, id
            FOR UPDATE
            "#,
        )
        .bind(LendingStatus::Issued)
        .bind(now)
        .fetch_all(&mut *tx)
        .await?;

        if !snapshot.is_empty() {
            let ids: Vec<i32> = snapshot.iter().map(|r| r.id).collect();

            sqlx::query("UPDATE lendings SET status = $1 WHERE id = ANY($2)")
                .bind(LendingStatus::Overdue)
                .bind(&ids)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(snapshot)
    }

    /// All lending records, most recent issue first
    pub async fn list_all(&self) -> AppResult<Vec<LendingRecord>> {
        let records = sqlx::query_as::<_, LendingRecord>(
            "SELECT * FROM lendings ORDER BY issue_date DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// One borrower's lending records, most recent issue first
    pub async fn list_by_borrower(&self, borrower_id: i32) -> AppResult<Vec<LendingRecord>> {
        let records = sqlx::query_as::<_, LendingRecord>(
            "SELECT * FROM lendings WHERE borrower_id = $1 ORDER BY issue_date DESC, id DESC",
        )
        .bind(borrower_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// One borrower's open (issued or overdue) records
    pub async fn list_active_by_borrower(&self, borrower_id: i32) -> AppResult<Vec<LendingRecord>> {
        let records = sqlx::query_as::<_, LendingRecord>(
            r#"
            SELECT * FROM lendings
            WHERE borrower_id = $1 AND status IN ($2, $3)
            ORDER BY issue_date DESC, id DESC
            "#,
        )
        .bind(borrower_id)
        .bind(LendingStatus::Issued)
        .bind(LendingStatus::Overdue)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// All records currently classified overdue, most overdue first
    pub async fn list_overdue(&self) -> AppResult<Vec<LendingRecord>> {
        let records = sqlx::query_as::<_, LendingRecord>(
            "SELECT * FROM lendings WHERE status = $1 ORDER BY due_date, id",
        )
        .bind(LendingStatus::Overdue)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

/// Whole days elapsed past the due date; zero for on-time returns.
pub(crate) fn overdue_days(due_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - due_date).num_days().max(0)
}
