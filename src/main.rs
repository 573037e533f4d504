use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use coffeeshop_api::config::AppConfig;
use coffeeshop_api::database::store::DrinkStore;
use coffeeshop_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, AUTH0_DOMAIN, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env();

    let store = DrinkStore::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    store.migrate().await.context("failed to run schema migration")?;

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let app = router(AppState::new(config, store));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("coffeeshop API listening on http://{}", bind_addr);
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
