//! Module `data_channel`
//!
//! Per-session data channel state and setup for passive (PASV) and active
//! (PORT) modes. Each session owns at most one configured channel; there is
//! no cross-session registry. A channel is consumed by a single transfer and
//! must be re-established for the next one.

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use log::{info, warn};
use tokio::net::{TcpListener, TcpStream};

use crate::config::ServerConfig;
use crate::error::TransferError;

/// A configured, not-yet-opened data channel.
pub enum DataChannel {
    /// PASV: listener bound on the server, waiting for the client to connect
    Passive(TcpListener),
    /// PORT: client-specified address the server will connect to
    Active(SocketAddr),
}

/// Bind a passive-mode listener on the first free port in the configured
/// range. Returns the channel and the bound address to report in the 227
/// reply.
pub async fn setup_passive(
    config: &ServerConfig,
) -> Result<(DataChannel, SocketAddr), TransferError> {
    for port in config.data_port_range() {
        match TcpListener::bind((config.bind_address.as_str(), port)).await {
            Ok(listener) => {
                let local_addr = listener.local_addr()?;
                info!("Passive data listener bound to {}", local_addr);
                return Ok((DataChannel::Passive(listener), local_addr));
            }
            Err(_) => continue,
        }
    }
    Err(TransferError::NoAvailablePort)
}

/// Record an active-mode target from a PORT argument (`ip:port`).
///
/// The target must carry the client's own IP and a non-privileged port.
pub fn setup_active(peer_ip: IpAddr, arg: &str) -> Result<DataChannel, TransferError> {
    let target = SocketAddr::from_str(arg)
        .map_err(|_| TransferError::InvalidPortCommand("Invalid address format".into()))?;

    if target.ip() != peer_ip {
        return Err(TransferError::IpMismatch {
            expected: peer_ip.to_string(),
            provided: target.ip().to_string(),
        });
    }

    if target.port() < 1024 {
        return Err(TransferError::InvalidPortRange(target.port()));
    }

    info!("Active data target recorded: {}", target);
    Ok(DataChannel::Active(target))
}

/// Open the data stream for one transfer.
///
/// Passive: accept the client's connection, rejecting peers other than the
/// session owner. Active: connect to the recorded target. Both are bounded by
/// the configured data timeout.
pub async fn open_data_stream(
    channel: DataChannel,
    peer_ip: IpAddr,
    timeout: Duration,
) -> Result<TcpStream, TransferError> {
    match channel {
        DataChannel::Passive(listener) => {
            let accept = tokio::time::timeout(timeout, listener.accept())
                .await
                .map_err(|_| TransferError::ConnectionTimeout)?;
            let (stream, addr) = accept?;

            if addr.ip() != peer_ip {
                warn!(
                    "Rejected data connection from {} (session owner is {})",
                    addr, peer_ip
                );
                return Err(TransferError::IpMismatch {
                    expected: peer_ip.to_string(),
                    provided: addr.ip().to_string(),
                });
            }

            info!("Data connection accepted from {}", addr);
            Ok(stream)
        }
        DataChannel::Active(target) => {
            let stream = tokio::time::timeout(timeout, TcpStream::connect(target))
                .await
                .map_err(|_| TransferError::ConnectionTimeout)??;
            info!("Data connection established to {}", target);
            Ok(stream)
        }
    }
}
