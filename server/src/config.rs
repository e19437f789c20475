//! Server configuration module.
//!
//! This module provides configuration loading for the replicator server from
//! environment variables.
//!
//! # Environment Variables
//!
//! - `REPLICATOR_AUTH_DIRECTORY`: Directory scanned for provider trust files
//!   (default: `./authentication`)
//! - `REPLICATOR_LISTEN_PORT`: Port to listen on (default: `8080`)
//!
//! # Invariants
//!
//! - `auth_directory` is always a valid path (it may not exist yet; the
//!   loader reports that at startup)
//! - `listen_port` is always a valid port number (1-65535)

use std::path::PathBuf;

/// Server configuration.
///
/// Contains all configuration parameters needed to run the server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory scanned recursively for provider trust files and the
    /// anonymous-access marker.
    pub auth_directory: PathBuf,
    /// Port to listen on for HTTP connections.
    pub listen_port: u16,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    InvalidValue {
        /// The variable name.
        name: String,
        /// Why the value was rejected.
        message: String,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl ServerConfig {
    /// Default port for the server.
    pub const DEFAULT_PORT: u16 = 8080;
    /// Default authentication directory.
    pub const DEFAULT_AUTH_DIRECTORY: &'static str = "./authentication";

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `REPLICATOR_LISTEN_PORT` is set but not a valid
    /// port number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let auth_directory = Self::load_auth_directory();
        let listen_port = Self::load_listen_port()?;

        Ok(Self {
            auth_directory,
            listen_port,
        })
    }

    /// Load the authentication directory from environment.
    ///
    /// Returns the default if not set.
    fn load_auth_directory() -> PathBuf {
        std::env::var("REPLICATOR_AUTH_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(Self::DEFAULT_AUTH_DIRECTORY))
    }

    /// Load the listen port from environment.
    ///
    /// Returns the default if not set.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is set but not a valid port number.
    fn load_listen_port() -> Result<u16, ConfigError> {
        match std::env::var("REPLICATOR_LISTEN_PORT") {
            Ok(value) => value.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                name: "REPLICATOR_LISTEN_PORT".to_string(),
                message: format!("'{value}' is not a valid port number (must be 1-65535)"),
            }),
            Err(_) => Ok(Self::DEFAULT_PORT),
        }
    }
}
