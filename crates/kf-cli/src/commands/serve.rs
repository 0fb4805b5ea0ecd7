//! Serve command: the read endpoint over HTTP

use anyhow::{Context, Result};
use kf_api::Store;
use std::net::SocketAddr;

use crate::cli::{GlobalArgs, ServeArgs};
use crate::commands::common::load_config;

/// Execute the serve command
pub async fn execute(args: &ServeArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let host = args.host.clone().unwrap_or(config.server.host);
    let port = args.port.unwrap_or(config.server.port);

    // File stores are opened read-only per request so runs can write between requests.
    let store = Store::for_database(&config.database).context("Failed to open database")?;
    let app = kf_api::router(store);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid host:port")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}:{}", host, port))?;

    println!("Serving {} at http://{}:{}", config.database.path, host, port);
    println!("Press Ctrl+C to stop.\n");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
