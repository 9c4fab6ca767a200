//! # Errors
//!
//! Top-level failures: configuration, logging setup, and whatever the
//! subsystem crates report through the game loop.

use std::path::PathBuf;

use starlight_networking::SyncError;
use starlight_world::WorldError;
use thiserror::Error;

/// Configuration loading failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config {path}: {source}")]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML is malformed or has wrongly typed fields.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be rendered as TOML.
    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of its allowed range.
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Dotted field name.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Anything the binary can fail with.
#[derive(Error, Debug)]
pub enum StarlightError {
    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A global subscriber was already installed.
    #[error("logging setup failed: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    /// Progression sync failed.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// World mutation failed.
    #[error(transparent)]
    World(#[from] WorldError),
}

/// Result type for configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for top-level operations.
pub type StarlightResult<T> = Result<T, StarlightError>;
