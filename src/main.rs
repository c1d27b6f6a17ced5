//! # Portal Maintenance Main Entry Point
//!
//! Loads configuration, initializes logging and the database pool, then
//! starts the HTTP server.

use portal_maintenance::{config::ConfigLoader, db, logging, server::run_server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_loader = ConfigLoader::new();
    let config = config_loader.load()?;

    logging::init_subscriber(&config);

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!("Configuration: {}", redacted_json);
    }

    let pool = db::init_pool(&config).await?;

    run_server(config, pool).await
}
