//! Module `reader`
//!
//! The command reader: pulls one line per call from the control connection,
//! suspending on the socket read and on the server shutdown token. EOF and
//! I/O errors surface as session-fatal statuses; interpretation of the line
//! belongs to the caller.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_util::sync::CancellationToken;

use crate::error::SessionError;

/// Buffered, cancellation-aware line reader over the control connection.
pub struct CommandReader<R> {
    reader: BufReader<R>,
    line: String,
    shutdown: CancellationToken,
}

impl<R: AsyncRead + Unpin> CommandReader<R> {
    pub fn new(read_half: R, shutdown: CancellationToken) -> Self {
        Self {
            reader: BufReader::new(read_half),
            line: String::new(),
            shutdown,
        }
    }

    /// Read the next command line, trimmed of its CRLF terminator.
    ///
    /// Returns `SessionError::ConnectionClosed` on EOF and
    /// `SessionError::Shutdown` when the server is stopping.
    pub async fn read_line(&mut self) -> Result<String, SessionError> {
        self.line.clear();

        tokio::select! {
            _ = self.shutdown.cancelled() => Err(SessionError::Shutdown),
            result = self.reader.read_line(&mut self.line) => {
                match result {
                    Ok(0) => Err(SessionError::ConnectionClosed),
                    Ok(_) => Ok(self.line.trim_end_matches(['\r', '\n']).to_string()),
                    Err(e) => Err(SessionError::Io(e)),
                }
            }
        }
    }
}
