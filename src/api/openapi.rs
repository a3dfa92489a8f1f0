//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, items, lendings, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Alexandria API",
        version = "0.3.0",
        description = "Library Inventory & Circulation REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Items & inventory
        items::list_items,
        items::get_item,
        items::create_item,
        items::update_item,
        items::delete_item,
        items::list_copies,
        items::add_copies,
        items::remove_copies,
        items::get_item_stats,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        // Lendings
        lendings::issue,
        lendings::return_lending,
        lendings::renew_lending,
        lendings::list_lendings,
        lendings::get_lending,
        lendings::list_overdue,
        lendings::sweep_overdue,
        lendings::list_user_active_lendings,
    ),
    components(
        schemas(
            // Items & inventory
            crate::models::item::Item,
            crate::models::item::CreateItem,
            crate::models::item::UpdateItem,
            crate::models::item::ItemStats,
            crate::models::copy::Copy,
            crate::models::copy::CopyStatus,
            items::CopyBatchRequest,
            // Users
            crate::models::user::User,
            crate::models::user::CreateUser,
            crate::models::user::Role,
            // Lendings
            crate::models::lending::LendingRecord,
            crate::models::lending::LendingStatus,
            crate::models::lending::ReturnReceipt,
            lendings::IssueRequest,
            lendings::ReturnResponse,
            lendings::SweepResponse,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "items", description = "Catalog item management"),
        (name = "inventory", description = "Copy provisioning and withdrawal"),
        (name = "users", description = "User management"),
        (name = "lendings", description = "Circulation: issue, return, renew, overdue")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
