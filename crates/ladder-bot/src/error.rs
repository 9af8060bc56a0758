//! Ladder bot error types.

use connector_core::ConnectorError;
use execution_core::GatewayError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while starting or running the bot.
#[derive(Debug, Error)]
pub enum BotError {
    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The streaming session could not be opened.
    #[error("session error: {0}")]
    Session(#[from] ConnectorError),

    /// An exchange command failed.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// `start` was called on a running bot.
    #[error("bot already running")]
    AlreadyRunning,

    /// No trading process could be started.
    #[error("startup failed: {0}")]
    Startup(String),
}

/// Errors in the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON for the expected shape.
    #[error("cannot parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
