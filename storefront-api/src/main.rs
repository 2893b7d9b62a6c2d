//! # Storefront API Server
//!
//! Multi-role shop: buyers browse and check out, sellers list products and
//! fulfill their order lines, admins approve sellers and moderate users.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/storefront \
//! SESSION_SECRET=$(openssl rand -hex 32) \
//! cargo run -p storefront-api
//! ```
//!
//! Set `LOG_FORMAT=json` for JSON log lines.

use anyhow::Context;
use storefront_api::{
    app::{build_router, AppState},
    config::Config,
};
use storefront_shared::db::{
    migrations::{ensure_database_exists, run_migrations},
    pool::{close_pool, create_pool},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Storefront API v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().context("Failed to load configuration")?;

    ensure_database_exists(&config.database.url)
        .await
        .context("Failed to create database")?;
    let pool = create_pool(config.pool_config())
        .await
        .context("Failed to connect to database")?;
    run_migrations(&pool).await.context("Failed to run migrations")?;

    let state = AppState::new(pool.clone(), config);
    state
        .uploads
        .ensure_dir()
        .await
        .context("Failed to create upload directory")?;

    let addr = state.config.bind_address();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Shutdown complete");

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "storefront_api=debug,storefront_shared=debug,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections");
}
