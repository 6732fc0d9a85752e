use actix_web::{App, HttpServer, web};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod app;
mod fetcher;
mod model;
mod service;

use app::{AppError, AppState};
use model::{Config, RunMode};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load .env file if present (ignore if missing)
    let _ = dotenvy::dotenv();

    let mode = RunMode::from_env()?;

    // Initialize tracing before the config file is read, RUST_LOG overrides the mode default
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| mode.default_log_directive().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let bind_addr = config.bind_addr();
    let state = AppState::new(&config)?;
    let pipeline = web::Data::from(state.pipeline);

    tracing::info!(mode = ?config.mode, "Starting scoreflash server on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(pipeline.clone())
            .configure(api::report::configure)
            .configure(api::health::configure)
            .configure(api::openapi::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await?;

    Ok(())
}
