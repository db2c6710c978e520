//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors; request-level errors are the
//! crates' own types rendered as problem+json.

mod config;

use auth::middleware::{AuthMiddlewareState, require_session};
use auth::{PgAuthRepository, auth_router};
use axum::{
    Json, Router, http,
    http::{HeaderName, Method, header},
    middleware,
    routing::get,
};
use platform::client::DEVICE_ID_HEADER;
use redemption::{AccountScanPurge, PgRedemptionRepository, qr_router};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServiceConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "api=info,auth=info,redemption=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServiceConfig::from_env()?;
    tracing::info!(
        bind_addr = %config.bind_addr,
        max_connections = config.database_max_connections,
        auth = ?config.auth,
        redemption = ?config.redemption,
        "Configuration loaded"
    );

    // Database connection
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(config.auth.store_timeout)
        .connect(&config.database_url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    let auth_store = PgAuthRepository::new(pool.clone());
    let qr_store = PgRedemptionRepository::new(pool.clone());

    // Startup cleanup; failures here should not prevent server startup
    if let Err(e) = auth_store.cleanup_expired().await {
        tracing::warn!(error = %e, "Auth session cleanup failed, continuing anyway");
    }
    if let Err(e) = qr_store.cleanup_expired().await {
        tracing::warn!(error = %e, "QR code cleanup failed, continuing anyway");
    }

    // CORS configuration
    let allowed_origins: Vec<http::HeaderValue> = config
        .frontend_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            HeaderName::from_static(DEVICE_ID_HEADER),
        ]));

    // Build router
    let auth_config = Arc::new(config.auth);
    let qr_config = Arc::new(config.redemption);
    let auth_store = Arc::new(auth_store);
    let qr_purge = {
        let store = Arc::new(qr_store.clone());
        Arc::new(AccountScanPurge::new(store.clone(), store, qr_config.clone()))
    };

    let session_guard = AuthMiddlewareState {
        repo: auth_store.clone(),
        config: auth_config.clone(),
    };

    let app = Router::new()
        .route("/health", get(health))
        .nest(
            "/api/auth",
            auth_router(
                PgAuthRepository::new(pool.clone()),
                qr_purge,
                auth_config.clone(),
            ),
        )
        .nest(
            "/api/qr",
            qr_router(qr_store, auth_store, auth_config, qr_config).route_layer(
                middleware::from_fn_with_state(session_guard, require_session::<PgAuthRepository>),
            ),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    tracing::info!("Listening on {}", config.bind_addr);

    let listener = TcpListener::bind(config.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
