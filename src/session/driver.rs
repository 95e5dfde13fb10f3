//! Module `driver`
//!
//! The session lifecycle driver: given an accepted control connection, run
//! the fixed four-stage pipeline (construct session, greet, authenticate,
//! dispatch) and tear the session down on every exit path. The driver owns no
//! state shared across connections and retries nothing; a failed stage is
//! logged with its name and control falls through to teardown.

use std::net::SocketAddr;
use std::sync::Arc;

use log::{error, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

use crate::auth;
use crate::config::ServerConfig;
use crate::error::SessionError;
use crate::protocol::replies::GREET;
use crate::protocol::{CommandReader, ReplyWriter, command_loop};
use crate::session::Session;

/// Run one full control-connection session.
///
/// Generic over the stream so tests can drive a session over an in-memory
/// duplex pipe; the server hands in a `TcpStream`.
pub async fn run_session<S>(
    stream: S,
    peer_addr: SocketAddr,
    config: Arc<ServerConfig>,
    shutdown: CancellationToken,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    // Stage 1: construct the session. There is nothing to tear down on
    // failure; dropping the stream closes the raw connection.
    let mut session = match Session::new(peer_addr, &config) {
        Ok(session) => session,
        Err(e) => {
            error!("Session construction failed for {}: {}", peer_addr, e);
            return;
        }
    };

    let (read_half, write_half) = tokio::io::split(stream);
    let mut reader = CommandReader::new(read_half, shutdown);
    let mut writer = ReplyWriter::new(write_half);

    info!("Session started for {}", peer_addr);

    // Stage 2: greeting, only when a banner is configured.
    let mut status: Result<(), SessionError> = if config.banner.is_empty() {
        Ok(())
    } else {
        writer.send(GREET, &config.banner).await
    };
    if let Err(ref e) = status {
        error!("Greeting failed for {}: {}", peer_addr, e);
    }

    // Stage 3: authentication.
    if status.is_ok() {
        status = auth::authenticate(&mut session, &mut reader, &mut writer, &config).await;
        if let Err(ref e) = status {
            match e {
                SessionError::LoginAttemptsExceeded(_) => {
                    warn!("Login rejected for {}: {}", peer_addr, e)
                }
                SessionError::ConnectionClosed | SessionError::Shutdown => {
                    info!("Authentication ended for {}: {}", peer_addr, e)
                }
                _ => error!("Authentication failed for {}: {}", peer_addr, e),
            }
        }
    }

    // Stage 4: command dispatch.
    if status.is_ok() {
        status = command_loop(&mut session, &mut reader, &mut writer, &config).await;
        if let Err(ref e) = status {
            match e {
                SessionError::ConnectionClosed | SessionError::Shutdown => {
                    info!("Command loop ended for {}: {}", peer_addr, e)
                }
                _ => error!("Command loop failed for {}: {}", peer_addr, e),
            }
        }
    }

    // Teardown: dropping the session releases the data channel; dropping the
    // reader/writer halves closes the control connection.
    session.clear_data_channel();
    info!("Session ended for {}", peer_addr);
}
