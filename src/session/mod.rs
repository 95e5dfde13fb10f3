//! Session engine
//!
//! The per-connection `Session` state container and the lifecycle driver that
//! runs one control connection from greeting through authentication and
//! command dispatch to teardown.

pub mod driver;
pub mod state;

pub use driver::run_session;
pub use state::{CommandScope, Session};
