pub mod auth;
pub mod client;
pub mod db;
pub mod error;
pub mod http;
mod migrations;
pub mod services;
pub mod state;
pub mod types;
pub mod util;

use std::net::SocketAddr;

use state::AppState;

/// Load config, open the store and serve the HTTP surface until Ctrl-C.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = state::load_config()?;
    let addr: SocketAddr = config.bind.parse()?;

    let state = AppState::open(config)?;
    let app = http::router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Testimonials server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Testimonials server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
