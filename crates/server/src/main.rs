use anyhow::Context;
use ninewatch_server::config::{Config, LogFormat};
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    info!(db_path = %config.db_path, "connecting to database");
    let pool = ninewatch_db::connect(&config.db_path)
        .await
        .context("failed to connect to database")?;

    ninewatch_db::migrate::run(&pool)
        .await
        .context("failed to run migrations")?;
    info!("migrations complete");

    if let Some(path) = &config.catalog_file {
        ninewatch_server::import::import_catalog_file(&pool, path)
            .await
            .context("failed to import catalog")?;
    }

    let jwt_secret = match &config.jwt_secret {
        Some(secret) => secret.clone(),
        None => {
            warn!("NINEWATCH_JWT_SECRET not set, tokens will not survive a restart");
            uuid::Uuid::new_v4().to_string()
        }
    };

    let app_state = ninewatch_server::state::AppState {
        db: pool,
        jwt_secret,
        token_ttl: config.token_ttl(),
    };

    let app = ninewatch_server::routes::build_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .context("failed to bind")?;
    info!(addr = %config.bind_addr, "server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
