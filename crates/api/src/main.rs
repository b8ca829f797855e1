//! Siteforge API server entrypoint

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use siteforge_api::{routes, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("failed to load configuration")?;

    let pool =
        siteforge_shared::create_pool(&config.database_url, config.database_max_connections)
            .await
            .context("failed to connect to database")?;

    siteforge_shared::run_migrations(&pool)
        .await
        .context("failed to run migrations")?;

    let bind_address = config.bind_address.clone();
    let state = AppState::new(config, pool);
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    tracing::info!("listening on {bind_address}");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
