use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("CINELOG_LOG").unwrap_or_else(|_| "info".into()))
        .init();

    // DB path: use CINELOG_DB env or default
    let db_path = std::env::var("CINELOG_DB").unwrap_or_else(|_| "cinelog.db".to_string());
    info!(db_path = %db_path, "connecting to database");

    let pool = cinelog_db::connect(&db_path)
        .await
        .context("failed to connect to database")?;

    // Run migrations
    cinelog_db::migrate::run(&pool)
        .await
        .context("failed to run migrations")?;
    info!("migrations complete");

    let scanner = Arc::new(cinelog_scanner::scan::ScanManager::new(pool.clone()));

    let app_state = cinelog_server::state::AppState { db: pool, scanner };
    let app = cinelog_server::routes::build_router(app_state);

    let bind_addr = std::env::var("CINELOG_BIND").unwrap_or_else(|_| "127.0.0.1:8220".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .context("failed to bind")?;
    info!(addr = %bind_addr, "server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
