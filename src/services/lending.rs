//! Circulation service: issue/return/renew transitions, the overdue sweep,
//! and the ownership-filtered read layer over lending records.

use std::sync::Arc;

use chrono::Duration;

use crate::{
    clock::Clock,
    config::LendingConfig,
    error::AppResult,
    models::{
        lending::{LendingRecord, ReturnReceipt},
        user::UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct LendingService {
    repository: Repository,
    config: LendingConfig,
    clock: Arc<dyn Clock>,
}

impl LendingService {
    pub fn new(repository: Repository, config: LendingConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            config,
            clock,
        }
    }

    /// Issue a copy to a borrower
    pub async fn issue(&self, borrower_id: i32, copy_id: i32) -> AppResult<LendingRecord> {
        // Verify borrower exists
        self.repository.users.get_by_id(borrower_id).await?;

        let now = self.clock.now();
        let due_date = now + Duration::days(self.config.loan_period_days);

        let record = self
            .repository
            .lendings
            .issue(borrower_id, copy_id, now, due_date)
            .await?;

        tracing::info!(
            lending_id = record.id,
            borrower_id,
            copy_id,
            "issued copy"
        );
        Ok(record)
    }

    /// Return a borrowed copy, assessing the overdue fine
    pub async fn return_loan(&self, lending_id: i32) -> AppResult<ReturnReceipt> {
        let receipt = self
            .repository
            .lendings
            .return_loan(lending_id, self.clock.now(), self.config.fine_per_day)
            .await?;

        tracing::info!(
            lending_id,
            overdue_days = receipt.overdue_days,
            fine = receipt.fine,
            "returned copy"
        );
        Ok(receipt)
    }

    /// Renew an on-time loan (single renewal allowed)
    pub async fn renew(&self, lending_id: i32) -> AppResult<LendingRecord> {
        let record = self
            .repository
            .lendings
            .renew(lending_id, self.config.renewal_extension_days)
            .await?;

        tracing::info!(lending_id, due_date = %record.due_date, "renewed loan");
        Ok(record)
    }

    /// Reclassify lapsed issued records as overdue; returns the records that
    /// were issued-and-lapsed at call time.
    pub async fn sweep_overdue(&self) -> AppResult<Vec<LendingRecord>> {
        let swept = self.repository.lendings.sweep_overdue(self.clock.now()).await?;

        if !swept.is_empty() {
            tracing::info!(count = swept.len(), "reclassified lapsed loans as overdue");
        }
        Ok(swept)
    }

    /// List lending records visible to the caller, most recent first.
    /// Self-scoped callers only ever see their own records.
    pub async fn list_records(&self, claims: &UserClaims) -> AppResult<Vec<LendingRecord>> {
        let records = if claims.role.is_self_scoped() {
            self.repository.lendings.list_by_borrower(claims.user_id).await?
        } else {
            self.repository.lendings.list_all().await?
        };

        debug_assert!(records.iter().all(|r| claims.can_access_borrower(r.borrower_id)));
        Ok(records)
    }

    /// Fetch a single record, enforcing the same ownership predicate as the
    /// list entry points.
    pub async fn get_record(&self, id: i32, claims: &UserClaims) -> AppResult<LendingRecord> {
        let record = self.repository.lendings.get_by_id(id).await?;
        claims.require_borrower_access(record.borrower_id)?;
        Ok(record)
    }

    /// A borrower's open records, gated by the ownership predicate
    pub async fn list_active_by_borrower(
        &self,
        borrower_id: i32,
        claims: &UserClaims,
    ) -> AppResult<Vec<LendingRecord>> {
        claims.require_borrower_access(borrower_id)?;
        self.repository.users.get_by_id(borrower_id).await?;
        self.repository.lendings.list_active_by_borrower(borrower_id).await
    }

    /// All overdue records; staff only
    pub async fn list_overdue(&self, claims: &UserClaims) -> AppResult<Vec<LendingRecord>> {
        claims.require_staff()?;
        self.repository.lendings.list_overdue().await
    }
}
