use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use lexdraft::config::Config;
use lexdraft::db::Database;
use lexdraft::{routes, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let db = Arc::new(Database::new(&config.database_path)?);
    let state = AppState::new(db, Arc::new(config.provider.clone()), config.pacing());

    let app = routes::router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "lexdraft listening");
    axum::serve(listener, app).await?;
    Ok(())
}
