//! Crux FTP Server - Entry Point
//!
//! A Rust FTP server built around a per-connection session engine
//! implementing the control-connection side of RFC 959.

use std::sync::Arc;

use log::{error, info};
use tokio_util::sync::CancellationToken;

use crux_ftp_server::config::ServerConfig;
use crux_ftp_server::server::Server;

#[tokio::main]
async fn main() {
    // Initialize the logger (env_logger picks up RUST_LOG environment variable)
    env_logger::init();

    info!("Launching Crux FTP server...");

    let config = match ServerConfig::load() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let shutdown = CancellationToken::new();

    // SIGINT cancels the token; every session observes it at its next read.
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
                shutdown.cancel();
            }
        });
    }

    let server = match Server::new(config, shutdown).await {
        Ok(server) => server,
        Err(e) => {
            error!("Server startup failed: {}", e);
            std::process::exit(1);
        }
    };

    server.start().await;
}
