//! Circulation endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::lending::LendingRecord,
};

use super::AuthenticatedUser;

/// Issue request
#[derive(Deserialize, ToSchema)]
pub struct IssueRequest {
    /// Borrower user ID
    pub borrower_id: i32,
    /// Copy to issue
    pub copy_id: i32,
}

/// Return response with the closed record and fine assessment
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    /// Return status
    pub status: String,
    /// Closed lending record
    pub record: LendingRecord,
    /// Whole days past the due date
    pub overdue_days: i64,
    /// Flat fine assessed for the overdue days
    pub fine: i64,
}

/// Overdue sweep response
#[derive(Serialize, ToSchema)]
pub struct SweepResponse {
    /// Number of records reclassified
    pub count: usize,
    /// The records that were issued-and-lapsed at sweep time
    pub records: Vec<LendingRecord>,
}

/// Issue a copy to a borrower
#[utoipa::path(
    post,
    path = "/lendings",
    tag = "lendings",
    security(("bearer_auth" = [])),
    request_body = IssueRequest,
    responses(
        (status = 201, description = "Copy issued", body = LendingRecord),
        (status = 404, description = "Borrower or copy not found"),
        (status = 409, description = "Copy not available")
    )
)]
pub async fn issue(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<IssueRequest>,
) -> AppResult<(StatusCode, Json<LendingRecord>)> {
    claims.require_staff()?;

    let record = state
        .services
        .lending
        .issue(request.borrower_id, request.copy_id)
        .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// Return a borrowed copy
#[utoipa::path(
    post,
    path = "/lendings/{id}/return",
    tag = "lendings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Lending record ID")
    ),
    responses(
        (status = 200, description = "Copy returned", body = ReturnResponse),
        (status = 404, description = "Lending record not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_lending(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ReturnResponse>> {
    claims.require_staff()?;

    let receipt = state.services.lending.return_loan(id).await?;

    Ok(Json(ReturnResponse {
        status: "returned".to_string(),
        record: receipt.record,
        overdue_days: receipt.overdue_days,
        fine: receipt.fine,
    }))
}

/// Renew an on-time loan
#[utoipa::path(
    post,
    path = "/lendings/{id}/renew",
    tag = "lendings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Lending record ID")
    ),
    responses(
        (status = 200, description = "Loan renewed", body = LendingRecord),
        (status = 404, description = "Lending record not found"),
        (status = 409, description = "Overdue, returned, or already renewed")
    )
)]
pub async fn renew_lending(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LendingRecord>> {
    claims.require_staff()?;

    let record = state.services.lending.renew(id).await?;
    Ok(Json(record))
}

/// List lending records visible to the caller
#[utoipa::path(
    get,
    path = "/lendings",
    tag = "lendings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Lending records, most recent first", body = Vec<LendingRecord>)
    )
)]
pub async fn list_lendings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<LendingRecord>>> {
    let records = state.services.lending.list_records(&claims).await?;
    Ok(Json(records))
}

/// Get a lending record
#[utoipa::path(
    get,
    path = "/lendings/{id}",
    tag = "lendings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Lending record ID")
    ),
    responses(
        (status = 200, description = "Lending record", body = LendingRecord),
        (status = 403, description = "Record belongs to another borrower"),
        (status = 404, description = "Lending record not found")
    )
)]
pub async fn get_lending(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LendingRecord>> {
    let record = state.services.lending.get_record(id, &claims).await?;
    Ok(Json(record))
}

/// List all overdue records (staff only)
#[utoipa::path(
    get,
    path = "/lendings/overdue",
    tag = "lendings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Overdue records", body = Vec<LendingRecord>),
        (status = 403, description = "Staff privileges required")
    )
)]
pub async fn list_overdue(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<LendingRecord>>> {
    let records = state.services.lending.list_overdue(&claims).await?;
    Ok(Json(records))
}

/// Run the overdue sweep on demand (staff only)
#[utoipa::path(
    post,
    path = "/lendings/sweep-overdue",
    tag = "lendings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Sweep executed", body = SweepResponse),
        (status = 403, description = "Staff privileges required")
    )
)]
pub async fn sweep_overdue(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<SweepResponse>> {
    claims.require_staff()?;

    let records = state.services.lending.sweep_overdue().await?;

    Ok(Json(SweepResponse {
        count: records.len(),
        records,
    }))
}

/// A borrower's open (issued or overdue) records
#[utoipa::path(
    get,
    path = "/users/{id}/lendings/active",
    tag = "lendings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrower user ID")
    ),
    responses(
        (status = 200, description = "Open lending records", body = Vec<LendingRecord>),
        (status = 403, description = "Another borrower's records"),
        (status = 404, description = "Borrower not found")
    )
)]
pub async fn list_user_active_lendings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<LendingRecord>>> {
    let records = state
        .services
        .lending
        .list_active_by_borrower(user_id, &claims)
        .await?;

    Ok(Json(records))
}
