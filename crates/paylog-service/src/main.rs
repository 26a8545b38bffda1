//! Paylog relay - signed payment-provider events into the record store.
//!
//! This is the main entry point for the relay service.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paylog_service::{create_router, AppState, ServiceConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,paylog=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting paylog relay");

    // Load configuration from environment and secrets files
    let config = ServiceConfig::from_env()?;

    tracing::info!(
        listen_addr = %config.listen_addr,
        products = config.products.len(),
        credentials_file = %config.store_credentials_file,
        "Service configuration loaded"
    );

    // Build app state (loads record-store credentials, builds clients)
    let state = AppState::new(config.clone())?;

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
