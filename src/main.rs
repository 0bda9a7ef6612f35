use anyhow::Context;
use log::{error, info};
use std::sync::Arc;

use crate::config::Config;
use crate::directory::Directory;
use crate::model::ApiContext;
use crate::store::NotionStore;

mod api;
mod config;
mod directory;
mod model;
mod store;
mod utils;

fn main() -> anyhow::Result<()> {
    // Read environment variables from .env
    dotenv::dotenv().ok();

    // Initialize logger from environment
    env_logger::init();

    // Parse config from environment
    let config = match envy::prefixed("APP_").from_env::<Config>() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to parse config: {}", e);
            return Ok(());
        }
    };

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(config.api_threads)
        .build()?;
    info!("Starting {} API threads", config.api_threads);

    // Without a store the page still renders, showing what is missing
    let directory = match config.store_config() {
        Ok(store_config) => {
            info!("Using Notion database {}", store_config.collection_id);
            let store = NotionStore::new(store_config).context("Failed to build HTTP client")?;
            Ok(Directory::new(Arc::new(store)))
        }
        Err(e) => {
            error!("Remote store not initialized: {}", e);
            Err(e)
        }
    };

    if let Ok(directory) = &directory {
        let directory = directory.clone();
        rt.spawn(async move { directory.refresh().await });
    }

    let context = ApiContext::new(directory).context("Failed to register metrics")?;
    rt.block_on(api::api(config, context));

    Ok(())
}
