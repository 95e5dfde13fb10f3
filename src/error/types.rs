//! Error types
//!
//! Defines domain-specific error types for each module of the FTP server.
//!
//! `SessionError` is the status channel of the session engine: every stage of
//! a session returns it, and every variant is fatal to the session. Protocol
//! violations (unknown verbs, unpaired RNTO, bad paths) are not errors at
//! this level; they become status-coded replies and the session continues.

use std::fmt;
use std::io;

/// Session-fatal failures: transport errors and deliberate terminations.
#[derive(Debug)]
pub enum SessionError {
    /// Read/write failure on the control connection
    Io(io::Error),
    /// Client closed the control connection
    ConnectionClosed,
    /// Server shutdown requested while the session was blocked on a read
    Shutdown,
    /// Login attempt budget exhausted
    LoginAttemptsExceeded(u32),
    /// Session could not be constructed for an accepted connection
    Setup(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Io(e) => write!(f, "I/O error on control connection: {}", e),
            SessionError::ConnectionClosed => write!(f, "control connection closed by client"),
            SessionError::Shutdown => write!(f, "server shutdown requested"),
            SessionError::LoginAttemptsExceeded(n) => {
                write!(f, "login rejected after {} failed attempts", n)
            }
            SessionError::Setup(msg) => write!(f, "session setup failed: {}", msg),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<io::Error> for SessionError {
    fn from(error: io::Error) -> Self {
        SessionError::Io(error)
    }
}

/// Authentication module errors
#[derive(Debug)]
pub enum AuthError {
    InvalidUsername(String),
    InvalidPassword(String),
    UserNotFound(String),
    MalformedInput(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidUsername(u) => write!(f, "Invalid username: {}", u),
            AuthError::InvalidPassword(u) => write!(f, "Invalid password for user: {}", u),
            AuthError::UserNotFound(u) => write!(f, "User not found: {}", u),
            AuthError::MalformedInput(s) => write!(f, "Malformed input: {}", s),
        }
    }
}

impl std::error::Error for AuthError {}

/// Storage module errors
#[derive(Debug)]
pub enum StorageError {
    FileNotFound(String),
    DirectoryNotFound(String),
    NotADirectory(String),
    NotAFile(String),
    InvalidPath(String),
    FileAlreadyExists(String),
    PathTraversal(String),
    IoError(io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::FileNotFound(p) => write!(f, "File not found: {}", p),
            StorageError::DirectoryNotFound(p) => write!(f, "Directory not found: {}", p),
            StorageError::NotADirectory(p) => write!(f, "Not a directory: {}", p),
            StorageError::NotAFile(p) => write!(f, "Not a regular file: {}", p),
            StorageError::InvalidPath(p) => write!(f, "Invalid path: {}", p),
            StorageError::FileAlreadyExists(p) => write!(f, "File already exists: {}", p),
            StorageError::PathTraversal(p) => write!(f, "Path traversal attempt: {}", p),
            StorageError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<io::Error> for StorageError {
    fn from(error: io::Error) -> Self {
        StorageError::IoError(error)
    }
}

/// Transfer module errors
#[derive(Debug)]
pub enum TransferError {
    NoAvailablePort,
    InvalidPortCommand(String),
    IpMismatch { expected: String, provided: String },
    InvalidPortRange(u16),
    ConnectionTimeout,
    TransferFailed(io::Error),
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::NoAvailablePort => write!(f, "No available port for data connection"),
            TransferError::InvalidPortCommand(msg) => write!(f, "Invalid PORT command: {}", msg),
            TransferError::IpMismatch { expected, provided } => {
                write!(f, "IP mismatch: expected {}, got {}", expected, provided)
            }
            TransferError::InvalidPortRange(port) => {
                write!(f, "Invalid port {}: must be 1024 or above", port)
            }
            TransferError::ConnectionTimeout => {
                write!(f, "Timeout waiting for data connection")
            }
            TransferError::TransferFailed(e) => write!(f, "Transfer failed: {}", e),
        }
    }
}

impl std::error::Error for TransferError {}

impl From<io::Error> for TransferError {
    fn from(error: io::Error) -> Self {
        TransferError::TransferFailed(error)
    }
}
