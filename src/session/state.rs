//! Module `state`
//!
//! Defines the `Session` struct holding the full state of one client's
//! control connection, and the per-command scope that is reset at the start
//! of every dispatch iteration.
//!
//! A `Session` is owned exclusively by its connection's task for its entire
//! life; nothing in it is shared across connections. State that must survive
//! past the current command (the pending rename source, the authenticated
//! user, the working directory) lives in session-durable fields and is
//! explicitly copied out of the command scope, never referenced into it.

use std::net::SocketAddr;

use crate::config::ServerConfig;
use crate::error::SessionError;
use crate::protocol::commands::{ParsedCommand, Verb};
use crate::storage::validation::virtual_to_real;
use crate::transfer::{DataChannel, TransferType};

/// Per-command scope: the most recently read verb/argument pair.
///
/// Overwritten every dispatch iteration; `reset` invalidates whatever the
/// previous command left here.
#[derive(Debug, Default)]
pub struct CommandScope {
    verb: Verb,
    name: String,
    arg: String,
}

impl CommandScope {
    /// Clear the scope at the start of a dispatch iteration.
    pub fn reset(&mut self) {
        self.verb = Verb::Unknown;
        self.name.clear();
        self.arg.clear();
    }

    /// Load the freshly parsed command into the scope.
    pub fn load(&mut self, parsed: ParsedCommand) {
        self.verb = parsed.verb;
        self.name = parsed.name;
        self.arg = parsed.arg;
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// Uppercased verb text as received, for logging and canned replies.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arg(&self) -> &str {
        &self.arg
    }
}

/// Represents the state of one connected FTP client.
pub struct Session {
    user: Option<String>,
    home_dir: String,
    cwd: String,
    rename_pending: Option<String>,
    data_channel: Option<DataChannel>,
    transfer_type: TransferType,
    peer_addr: SocketAddr,
    /// Per-command scope, reset by the dispatcher every iteration
    pub command: CommandScope,
}

impl Session {
    /// Construct the session for an accepted connection.
    ///
    /// Fails when the configured server root is missing or not a directory;
    /// the caller closes the raw connection directly in that case since there
    /// is no session to tear down.
    pub fn new(peer_addr: SocketAddr, config: &ServerConfig) -> Result<Self, SessionError> {
        let root = config.server_root_path();
        if !root.is_dir() {
            return Err(SessionError::Setup(format!(
                "server root {} is missing or not a directory",
                root.display()
            )));
        }

        Ok(Self {
            user: None,
            home_dir: "/".to_string(),
            cwd: "/".to_string(),
            rename_pending: None,
            data_channel: None,
            transfer_type: TransferType::default(),
            peer_addr,
            command: CommandScope::default(),
        })
    }

    // --------------------
    // Identity and directories
    // --------------------

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn home_dir(&self) -> &str {
        &self.home_dir
    }

    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    pub fn set_cwd(&mut self, path: String) {
        self.cwd = path;
    }

    /// Record the authenticated user and resolve the home directory.
    ///
    /// The home is the virtual path `/<user>` when `<server_root>/<user>`
    /// exists and is a directory; otherwise it falls back to the virtual
    /// root. The working directory starts at the home.
    pub fn login(&mut self, username: String, config: &ServerConfig) {
        let candidate = format!("/{}", username);
        let real = virtual_to_real(&config.server_root_path(), &candidate);

        self.home_dir = if real.is_dir() {
            candidate
        } else {
            "/".to_string()
        };
        self.cwd = self.home_dir.clone();
        self.user = Some(username);
    }

    // --------------------
    // Rename pairing
    // --------------------

    /// Hold the rename source across to the next command.
    ///
    /// The path is copied into session-durable state here; the command scope
    /// it came from is reset before the pairing RNTO is read.
    pub fn set_rename_pending(&mut self, source: String) {
        self.rename_pending = Some(source);
    }

    pub fn rename_pending(&self) -> Option<&str> {
        self.rename_pending.as_deref()
    }

    /// Consume the pending rename source, exactly once.
    pub fn take_rename_pending(&mut self) -> Option<String> {
        self.rename_pending.take()
    }

    pub fn clear_rename_pending(&mut self) {
        self.rename_pending = None;
    }

    // --------------------
    // Data channel and transfer type
    // --------------------

    pub fn set_data_channel(&mut self, channel: DataChannel) {
        self.data_channel = Some(channel);
    }

    /// Consume the configured data channel for one transfer.
    pub fn take_data_channel(&mut self) -> Option<DataChannel> {
        self.data_channel.take()
    }

    pub fn clear_data_channel(&mut self) {
        self.data_channel = None;
    }

    pub fn has_data_channel(&self) -> bool {
        self.data_channel.is_some()
    }

    pub fn transfer_type(&self) -> TransferType {
        self.transfer_type
    }

    pub fn set_transfer_type(&mut self, transfer_type: TransferType) {
        self.transfer_type = transfer_type;
    }
}
