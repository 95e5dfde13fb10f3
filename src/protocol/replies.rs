//! FTP reply handling
//!
//! Reply codes the engine emits and the writer that puts status-coded lines
//! on the control connection. A write failure here is a transport failure and
//! is fatal to the session regardless of what was being reported.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::SessionError;

pub const DATA_OPEN: u16 = 150;
pub const OK: u16 = 200;
pub const ALLO_OK: u16 = 202;
pub const SITE_OK: u16 = 202;
pub const FEAT_END: u16 = 211;
pub const SYST_OK: u16 = 215;
pub const GREET: u16 = 220;
pub const GOODBYE: u16 = 221;
pub const TRANSFER_OK: u16 = 226;
pub const PASV_OK: u16 = 227;
pub const LOGIN_OK: u16 = 230;
pub const FILE_ACTION_OK: u16 = 250;
pub const PATH_CREATED: u16 = 257;
pub const GIVE_PWORD: u16 = 331;
pub const RNFR_OK: u16 = 350;
pub const CANT_OPEN_DATA: u16 = 425;
pub const TRANSFER_ABORTED: u16 = 426;
pub const BAD_COMMAND: u16 = 500;
pub const BAD_ARGS: u16 = 501;
pub const NOT_IMPLEMENTED: u16 = 502;
pub const BAD_SEQUENCE: u16 = 503;
pub const BAD_PARAMETER: u16 = 504;
pub const LOGIN_ERR: u16 = 530;
pub const ACTION_NOT_TAKEN: u16 = 550;

/// Format an FTP reply line.
pub fn format_reply(code: u16, message: &str) -> String {
    format!("{} {}\r\n", code, message)
}

/// Writes status-coded reply lines to the control connection.
pub struct ReplyWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> ReplyWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Send one reply line. Errors are transport failures.
    pub async fn send(&mut self, code: u16, message: &str) -> Result<(), SessionError> {
        self.writer
            .write_all(format_reply(code, message).as_bytes())
            .await?;
        self.writer.flush().await?;
        Ok(())
    }
}
