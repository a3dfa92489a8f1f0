//! Lending record model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;

/// Lending record lifecycle status.
///
/// Issued → Returned, or Issued → Overdue → Returned. Returned is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[repr(i16)]
#[serde(rename_all = "lowercase")]
pub enum LendingStatus {
    Issued = 0,
    Overdue = 1,
    Returned = 2,
}

impl From<i16> for LendingStatus {
    fn from(v: i16) -> Self {
        match v {
            1 => LendingStatus::Overdue,
            2 => LendingStatus::Returned,
            _ => LendingStatus::Issued,
        }
    }
}

impl LendingStatus {
    /// Open records hold a copy; returned ones are history.
    pub fn is_open(&self) -> bool {
        matches!(self, LendingStatus::Issued | LendingStatus::Overdue)
    }
}

impl sqlx::Type<Postgres> for LendingStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i16 as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for LendingStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let v: i16 = Decode::<Postgres>::decode(value)?;
        Ok(LendingStatus::from(v))
    }
}

impl Encode<'_, Postgres> for LendingStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <i16 as Encode<Postgres>>::encode(*self as i16, buf)
    }
}

/// Lending record from database.
///
/// Append-only: a record is created at issue time and mutated by
/// return/renew/overdue-sweep, never deleted. `item_id` is denormalized from
/// the copy so per-item statistics survive copy removal.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LendingRecord {
    pub id: i32,
    pub borrower_id: i32,
    pub copy_id: i32,
    pub item_id: i32,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: LendingStatus,
    pub renew_count: i16,
}

/// Outcome of returning a copy: the closed record plus the fine assessment.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReturnReceipt {
    pub record: LendingRecord,
    pub overdue_days: i64,
    pub fine: i64,
}
