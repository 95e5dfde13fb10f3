//! Module `core`
//!
//! The accept loop. All per-connection work happens in `session::run_session`;
//! the server only binds the control socket, prepares the root directory, and
//! spawns a task per accepted connection. Sessions share no mutable state,
//! only the read-only configuration and the shutdown token.

use std::io;
use std::sync::Arc;

use log::{error, info, warn};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::session::run_session;

pub struct Server {
    listener: TcpListener,
    config: Arc<ServerConfig>,
    shutdown: CancellationToken,
}

impl Server {
    /// Bind the control socket and make sure the server root exists.
    pub async fn new(
        config: Arc<ServerConfig>,
        shutdown: CancellationToken,
    ) -> Result<Self, io::Error> {
        let socket = config.control_socket();
        let listener = TcpListener::bind(&socket).await.map_err(|e| {
            error!("Failed to bind to {}: {}", socket, e);
            e
        })?;
        info!("Server bound to {}", socket);

        std::fs::create_dir_all(config.server_root_path())?;
        info!("Server root directory: {}", config.server_root);

        Ok(Self {
            listener,
            config,
            shutdown,
        })
    }

    /// Accept connections until the shutdown token fires.
    pub async fn start(&self) {
        info!("Starting Crux FTP server");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Accept loop stopping");
                    break;
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            info!("Accepted connection from {}", addr);
                            let config = Arc::clone(&self.config);
                            let shutdown = self.shutdown.child_token();

                            // Spawn a task per client so the accept loop
                            // never blocks on a session.
                            tokio::spawn(async move {
                                run_session(stream, addr, config, shutdown).await;
                            });
                        }
                        Err(e) => {
                            warn!("Error accepting connection: {}", e);
                        }
                    }
                }
            }
        }
    }
}
