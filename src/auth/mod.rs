//! Authentication system
//!
//! Credential storage, username/password validation, and the login
//! controller that gates every session before the command loop.

pub mod controller;
pub mod credentials;
pub mod validator;

pub use controller::authenticate;
pub use validator::{validate_password, validate_user};
