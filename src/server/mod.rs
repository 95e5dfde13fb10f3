//! Server core functionality
//!
//! Binds the control socket and spawns one session task per accepted
//! connection.

pub mod core;

pub use core::Server;
