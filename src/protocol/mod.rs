//! FTP protocol implementation
//!
//! Verb table and command parsing, reply codes and writing, the
//! cancellation-aware command reader, and the command dispatcher with its
//! per-verb handlers.

pub mod commands;
pub mod dispatcher;
pub mod handlers;
pub mod reader;
pub mod replies;

pub use commands::{ParsedCommand, Verb, parse_command};
pub use dispatcher::command_loop;
pub use reader::CommandReader;
pub use replies::ReplyWriter;
