use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use salonbook::config::AppConfig;
use salonbook::db;
use salonbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    if config.admin_token == "changeme" {
        tracing::warn!("ADMIN_TOKEN is not set, using the default token");
    }

    let conn = db::init_db(&config.database_url, &config.migrations_dir)?;

    let state = Arc::new(AppState::new(conn, config.clone()));
    let app = salonbook::build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
