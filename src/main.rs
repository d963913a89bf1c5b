mod config;
mod error;
mod handlers;
mod models;
mod predictor;
mod registry;
mod state;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use log::info;

use config::Config;
use registry::LocalRegistry;
use state::ServingState;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    let registry = LocalRegistry::new(&config.registry_dir);
    info!("model registry at {}", registry.root().display());

    let state = ServingState::open(Arc::new(registry), &config.model_name, &config.model_version)
        .context("failed to load initial model")?;
    let state = web::Data::new(state);

    let bind_address = config.bind_address();
    info!("Server running at http://{}", bind_address);

    let mut server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(state.clone())
            .configure(handlers::configure)
    });
    if let Some(workers) = config.workers {
        server = server.workers(workers);
    }

    server.bind(&bind_address)?.run().await?;
    Ok(())
}
