//! Configuration management for the Crux FTP server
//!
//! All values are loaded once during startup and are read-only afterwards;
//! sessions receive the configuration behind an `Arc` and never mutate it.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Process-wide server configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// IP address to bind the FTP control connection
    pub bind_address: String,

    /// Port for the FTP control connection
    pub control_port: u16,

    /// Greeting banner sent on connect. An empty string is a valid
    /// "no greeting" configuration, not an error.
    pub banner: String,

    /// Maximum failed USER/PASS rounds before the connection is dropped
    pub max_login_attempts: u32,

    /// Root directory for FTP operations; user homes live directly under it
    pub server_root: String,

    /// Port range scanned for PASV data listeners
    pub data_port_min: u16,
    pub data_port_max: u16,

    /// Maximum accepted FTP command line length
    pub max_command_length: usize,

    /// Timeout for establishing data connections
    pub data_timeout_secs: u64,

    /// Maximum accepted username/password length
    pub max_username_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            control_port: 2121,
            banner: "Welcome to Crux FTP Server".to_string(),
            max_login_attempts: 3,
            server_root: "./server_root".to_string(),
            data_port_min: 2122,
            data_port_max: 2200,
            max_command_length: 512,
            data_timeout_secs: 30,
            max_username_length: 64,
        }
    }
}

impl ServerConfig {
    /// Load configuration: built-in defaults, overridden by an optional
    /// `config.toml`, overridden by `CRUX_FTP_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = ServerConfig::default();

        let settings = Config::builder()
            .set_default("bind_address", defaults.bind_address)?
            .set_default("control_port", defaults.control_port as i64)?
            .set_default("banner", defaults.banner)?
            .set_default("max_login_attempts", defaults.max_login_attempts as i64)?
            .set_default("server_root", defaults.server_root)?
            .set_default("data_port_min", defaults.data_port_min as i64)?
            .set_default("data_port_max", defaults.data_port_max as i64)?
            .set_default("max_command_length", defaults.max_command_length as i64)?
            .set_default("data_timeout_secs", defaults.data_timeout_secs as i64)?
            .set_default("max_username_length", defaults.max_username_length as i64)?
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("CRUX_FTP"))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.control_port == 0 {
            return Err(ConfigError::Message("Control port cannot be 0".into()));
        }

        if self.max_login_attempts == 0 {
            return Err(ConfigError::Message(
                "max_login_attempts must be greater than 0".into(),
            ));
        }

        if self.data_port_min >= self.data_port_max {
            return Err(ConfigError::Message(
                "data_port_min must be less than data_port_max".into(),
            ));
        }

        if self.server_root.is_empty() {
            return Err(ConfigError::Message("server_root cannot be empty".into()));
        }

        if self.max_command_length == 0 {
            return Err(ConfigError::Message(
                "max_command_length must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Get bind address and control port as a socket address string.
    pub fn control_socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.control_port)
    }

    /// Get the server root as a `PathBuf`.
    pub fn server_root_path(&self) -> PathBuf {
        PathBuf::from(&self.server_root)
    }

    /// Get the data connection timeout as a `Duration`.
    pub fn data_timeout(&self) -> Duration {
        Duration::from_secs(self.data_timeout_secs)
    }

    /// Port range scanned for PASV data listeners.
    pub fn data_port_range(&self) -> std::ops::Range<u16> {
        self.data_port_min..self.data_port_max
    }
}
