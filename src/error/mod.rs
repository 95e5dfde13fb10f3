//! Error types for the Crux FTP server
//!
//! Defines domain-specific error types for each module of the server.

pub mod types;

pub use types::{AuthError, SessionError, StorageError, TransferError};
