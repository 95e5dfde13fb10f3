//! Module `file_ops`
//!
//! Streams file content and directory listings over an opened data stream.
//! Uploads go through a temporary file and an atomic rename so a broken
//! transfer never leaves a half-written file at the final name.

use std::path::Path;

use log::{error, info};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::error::TransferError;

/// Send a file to the client; closes the write side so the client sees EOF.
pub async fn send_file(stream: &mut TcpStream, real_path: &Path) -> Result<u64, TransferError> {
    let mut file = File::open(real_path).await?;
    let bytes = tokio::io::copy(&mut file, stream).await?;
    stream.shutdown().await?;
    info!("Sent {} ({} bytes)", real_path.display(), bytes);
    Ok(bytes)
}

/// Receive a file from the client into `temp_path`, then move it to
/// `final_path`. The temporary file is removed on any failure.
pub async fn receive_file(
    stream: &mut TcpStream,
    final_path: &Path,
    temp_path: &Path,
) -> Result<u64, TransferError> {
    let mut temp_file = File::create(temp_path).await?;

    let bytes = match tokio::io::copy(stream, &mut temp_file).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Upload to {} failed: {}", temp_path.display(), e);
            drop(temp_file);
            let _ = tokio::fs::remove_file(temp_path).await;
            return Err(TransferError::TransferFailed(e));
        }
    };

    temp_file.flush().await?;
    drop(temp_file);

    if let Err(e) = tokio::fs::rename(temp_path, final_path).await {
        error!(
            "Failed to move {} to {}: {}",
            temp_path.display(),
            final_path.display(),
            e
        );
        let _ = tokio::fs::remove_file(temp_path).await;
        return Err(TransferError::TransferFailed(e));
    }

    info!("Received {} ({} bytes)", final_path.display(), bytes);
    Ok(bytes)
}

/// Receive a file from the client, appending to `real_path`.
pub async fn append_file(stream: &mut TcpStream, real_path: &Path) -> Result<u64, TransferError> {
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(real_path)
        .await?;
    let bytes = tokio::io::copy(stream, &mut file).await?;
    file.flush().await?;
    info!("Appended to {} ({} bytes)", real_path.display(), bytes);
    Ok(bytes)
}

/// Send a directory listing, one entry per line.
pub async fn send_listing(
    stream: &mut TcpStream,
    entries: &[String],
) -> Result<(), TransferError> {
    let mut data = entries.join("\r\n");
    data.push_str("\r\n");
    stream.write_all(data.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}
