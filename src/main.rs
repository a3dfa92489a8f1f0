//! Alexandria Server - Library Inventory & Circulation System

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use alexandria_server::{
    api,
    clock::SystemClock,
    config::AppConfig,
    repository::Repository,
    services::Services,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            format!("alexandria_server={},tower_http=debug", config.logging.level).into()
        });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Alexandria Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool. Lock waits are bounded so contended
    // transactions fail as retryable errors instead of blocking forever.
    let lock_timeout = config.database.lock_timeout_seconds;
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                sqlx::query(&format!("SET lock_timeout = '{}s'", lock_timeout))
                    .execute(conn)
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;
    let sweep_interval = config.lending.sweep_interval_seconds;

    // Create repository and services
    let repository = Repository::new(pool);
    let services = Arc::new(Services::new(
        repository,
        config.lending.clone(),
        Arc::new(SystemClock),
    ));

    // Periodic overdue sweep alongside the on-demand endpoint
    if sweep_interval > 0 {
        let sweeper = services.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(sweep_interval));
            loop {
                interval.tick().await;
                match sweeper.lending.sweep_overdue().await {
                    Ok(swept) if !swept.is_empty() => {
                        tracing::info!(count = swept.len(), "background overdue sweep");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!("background overdue sweep failed: {}", e),
                }
            }
        });
    }

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services,
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().expect("Invalid host address"),
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Items (catalog)
        .route("/items", get(api::items::list_items))
        .route("/items", post(api::items::create_item))
        .route("/items/:id", get(api::items::get_item))
        .route("/items/:id", put(api::items::update_item))
        .route("/items/:id", delete(api::items::delete_item))
        // Inventory
        .route("/items/:id/copies", get(api::items::list_copies))
        .route("/items/:id/copies", post(api::items::add_copies))
        .route("/items/:id/copies", delete(api::items::remove_copies))
        .route("/items/:id/stats", get(api::items::get_item_stats))
        // Users
        .route("/users", get(api::users::list_users))
        .route("/users", post(api::users::create_user))
        .route("/users/:id", get(api::users::get_user))
        .route("/users/:id/lendings/active", get(api::lendings::list_user_active_lendings))
        // Lendings
        .route("/lendings", post(api::lendings::issue))
        .route("/lendings", get(api::lendings::list_lendings))
        .route("/lendings/overdue", get(api::lendings::list_overdue))
        .route("/lendings/sweep-overdue", post(api::lendings::sweep_overdue))
        .route("/lendings/:id", get(api::lendings::get_lending))
        .route("/lendings/:id/return", post(api::lendings::return_lending))
        .route("/lendings/:id/renew", post(api::lendings::renew_lending))
        .with_state(state.clone());

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
