use std::sync::Arc;

use clubtally::ea::EaApiClient;
use clubtally::store::SqliteStore;
use clubtally::{Config, LeaguePipeline, logging};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    logging::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let store = match SqliteStore::connect(&config.database_url).await {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, "failed to open the match store");
            std::process::exit(1);
        }
    };

    info!(clubs = config.roster.len(), "starting league tracker");

    let ea = Arc::new(EaApiClient::new(config.ea_base_url.clone()));
    let pipeline = LeaguePipeline::new(ea, Arc::new(store), Arc::new(config));
    let _tasks = pipeline.start();

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => error!(error = %e, "failed to listen for shutdown signal"),
    }
}
