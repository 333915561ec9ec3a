use axum_helpers::server::{create_production_app, create_router, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use std::time::Duration;
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;

    init_tracing(&config.environment);

    // A single attempt; an unreachable server aborts startup.
    let mongo_client = database::mongodb::connect_from_config(&config.mongodb).await?;
    let db = mongo_client.database(config.mongodb.database());

    let collections = db.list_collection_names().await?;
    info!(
        database = config.mongodb.database(),
        collection = config.mongodb.collection(),
        ?collections,
        "Connected to MongoDB"
    );

    let state = AppState {
        config,
        mongo_client,
        db,
    };

    let api_routes = api::routes(&state).merge(health_router(state.config.app));
    let router = create_router::<openapi::ApiDoc>(api_routes)?;

    info!("Starting Users API with graceful shutdown (30s timeout)");

    let mongo_client = state.mongo_client.clone();

    create_production_app(
        router,
        &state.config.server,
        Duration::from_secs(30),
        async move {
            info!("Shutting down: closing MongoDB connections");
            // The driver closes its pool once the last handle is dropped
            drop(mongo_client);
            info!("MongoDB connection closed successfully");
        },
    )
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Users API shutdown complete");
    Ok(())
}
