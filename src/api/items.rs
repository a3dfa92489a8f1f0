//! Catalog item and inventory endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        copy::Copy,
        item::{CreateItem, Item, ItemStats, UpdateItem},
    },
};

use super::AuthenticatedUser;

/// Copy batch request for add/remove
#[derive(Deserialize, ToSchema)]
pub struct CopyBatchRequest {
    /// Number of copies to add or remove
    pub count: i32,
}

/// List catalog items
#[utoipa::path(
    get,
    path = "/items",
    tag = "items",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All catalog items", body = Vec<Item>)
    )
)]
pub async fn list_items(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Item>>> {
    let items = state.services.catalog.list_items().await?;
    Ok(Json(items))
}

/// Get a catalog item
#[utoipa::path(
    get,
    path = "/items/{id}",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item details", body = Item),
        (status = 404, description = "Item not found")
    )
)]
pub async fn get_item(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Item>> {
    let item = state.services.catalog.get_item(id).await?;
    Ok(Json(item))
}

/// Create a catalog item (starts with zero copies)
#[utoipa::path(
    post,
    path = "/items",
    tag = "items",
    security(("bearer_auth" = [])),
    request_body = CreateItem,
    responses(
        (status = 201, description = "Item created", body = Item),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn create_item(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateItem>,
) -> AppResult<(StatusCode, Json<Item>)> {
    claims.require_staff()?;
    request
        .validate()
        .map_err(|e| AppError::InvalidArgument(e.to_string()))?;

    let item = state.services.catalog.create_item(request).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Update a catalog item's bibliographic fields
#[utoipa::path(
    put,
    path = "/items/{id}",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    request_body = UpdateItem,
    responses(
        (status = 200, description = "Item updated", body = Item),
        (status = 404, description = "Item not found")
    )
)]
pub async fn update_item(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateItem>,
) -> AppResult<Json<Item>> {
    claims.require_staff()?;
    request
        .validate()
        .map_err(|e| AppError::InvalidArgument(e.to_string()))?;

    let item = state.services.catalog.update_item(id, request).await?;
    Ok(Json(item))
}

/// Delete a catalog item (refused while copies are provisioned)
#[utoipa::path(
    delete,
    path = "/items/{id}",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 404, description = "Item not found"),
        (status = 409, description = "Item still has copies")
    )
)]
pub async fn delete_item(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    state.services.catalog.delete_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List an item's copies
#[utoipa::path(
    get,
    path = "/items/{id}/copies",
    tag = "inventory",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item's copies", body = Vec<Copy>),
        (status = 404, description = "Item not found")
    )
)]
pub async fn list_copies(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<Copy>>> {
    let copies = state.services.inventory.list_copies(id).await?;
    Ok(Json(copies))
}

/// Provision copies for an item
#[utoipa::path(
    post,
    path = "/items/{id}/copies",
    tag = "inventory",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    request_body = CopyBatchRequest,
    responses(
        (status = 201, description = "Copies provisioned", body = ItemStats),
        (status = 400, description = "Count out of range"),
        (status = 404, description = "Item not found")
    )
)]
pub async fn add_copies(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<CopyBatchRequest>,
) -> AppResult<(StatusCode, Json<ItemStats>)> {
    claims.require_staff()?;

    let stats = state.services.inventory.add_copies(id, request.count).await?;
    Ok((StatusCode::CREATED, Json(stats)))
}

/// Withdraw available copies from an item
#[utoipa::path(
    delete,
    path = "/items/{id}/copies",
    tag = "inventory",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    request_body = CopyBatchRequest,
    responses(
        (status = 200, description = "Copies withdrawn", body = ItemStats),
        (status = 400, description = "Count out of range"),
        (status = 404, description = "Item not found"),
        (status = 409, description = "Not enough available copies")
    )
)]
pub async fn remove_copies(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<CopyBatchRequest>,
) -> AppResult<Json<ItemStats>> {
    claims.require_staff()?;

    let stats = state.services.inventory.remove_copies(id, request.count).await?;
    Ok(Json(stats))
}

/// Get an item's inventory snapshot
#[utoipa::path(
    get,
    path = "/items/{id}/stats",
    tag = "inventory",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Inventory snapshot", body = ItemStats),
        (status = 404, description = "Item not found")
    )
)]
pub async fn get_item_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ItemStats>> {
    let stats = state.services.inventory.get_stats(id).await?;
    Ok(Json(stats))
}
