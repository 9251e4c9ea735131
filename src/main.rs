use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use salescrm::{config::Config, db::Database, seed, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("salescrm=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    let db = Database::new_lazy(&config.database_url, config.pool_settings())?;

    // The server starts without a database; requests answer 503 until an
    // admin triggers a reconnect, which prepares the schema again.
    info!("Preparing database...");
    if let Err(e) = seed::prepare_database(&db, &config).await {
        warn!("Database not ready at startup, skipping migrations and seeding: {:#}", e);
    }

    let state = Arc::new(AppState {
        db,
        config: config.clone(),
    });
    let app = salescrm::create_app(state);

    let listener = tokio::net::TcpListener::bind(&config.server_address).await?;
    info!("Server starting on {}", config.server_address);

    axum::serve(listener, app).await?;

    Ok(())
}
