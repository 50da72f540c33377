//! Main Entrypoint for the Classroom API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing the shared completion client and topic lookup.
//! 3. Constructing the Axum router and applying middleware.
//! 4. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use classroom_api::{config::Config, router::create_router, state::AppState};
use classroom_core::{
    llm_client::{CompletionClient, OpenAICompatibleClient},
    prompts::Prompts,
    tutor::WikipediaClient,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {e}");
        return;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Shared Services ---
    let prompts = match &config.prompts_path {
        Some(dir) => Prompts::load(dir)?,
        None => Prompts::default(),
    };
    let api_key = config
        .api_key()
        .context("No API key for the configured provider")?;
    let llm_client: Arc<dyn CompletionClient> = Arc::new(OpenAICompatibleClient::for_provider(
        &config.provider,
        api_key,
        config.chat_model.clone(),
    ));
    let lookup = Arc::new(WikipediaClient::default());

    let app_state = Arc::new(AppState::new(
        config.clone(),
        llm_client.clone(),
        lookup,
        prompts,
    ));

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 5. Start Server ---
    info!(
        provider = ?config.provider,
        model = %config.chat_model,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let served = serve(app, &config).await;

    llm_client.close().await;
    info!("Server has shut down.");
    served
}

async fn serve(app: axum::Router, config: &Config) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}
