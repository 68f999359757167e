//! SaaStack API server entry point.

use std::sync::Arc;

use saastack_api::config::ApiConfig;
use saastack_api::error::AppError;
use saastack_api::routes;
use saastack_api::state::AppState;
use saastack_api::telemetry;
use saastack_core::event_store::EventStore;
use saastack_event_store::memory_event_store::InMemoryEventStore;
use saastack_event_store::pg_event_store::PgEventStore;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

async fn connect_event_store(config: &ApiConfig) -> Result<Arc<dyn EventStore>, AppError> {
    let Some(database_url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set, streams are kept in memory only");
        return Ok(Arc::new(InMemoryEventStore::new()));
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(database_url)
        .await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("Connected to PostgreSQL and applied migrations");

    Ok(Arc::new(PgEventStore::new(pool)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = ApiConfig::from_env()?;
    let tracing_handle = telemetry::init(&config)?;

    tracing::info!("Starting SaaStack API server");

    let event_store = connect_event_store(&config).await?;
    let app_state = AppState::new(event_store);

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = routes::router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.socket_addr()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = tracing_handle.shutdown() {
        eprintln!("{e}");
    }

    Ok(())
}
