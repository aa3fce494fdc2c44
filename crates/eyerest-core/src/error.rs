//! Core error types for eyerest-core.
//!
//! Errors are grouped by the component that raises them. None of them ever
//! escapes the session worker: the machine logs and carries on, so these
//! types mostly surface through the CLI and the storage helpers.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for eyerest-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Statistics ledger errors
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The session worker has stopped and no longer accepts events
    #[error("session worker is not running")]
    WorkerStopped,
}

/// Statistics ledger errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Failed to read the ledger file
    #[error("Failed to read ledger at {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Ledger file exists but is not valid JSON
    #[error("Ledger at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Failed to write the ledger file
    #[error("Failed to write ledger at {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization failed before writing
    #[error("Failed to serialize ledger: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load config from {path}: {source}")]
    LoadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to save configuration
    #[error("Failed to save config to {path}: {source}")]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration value
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key is not part of the configuration
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Configuration parse error
    #[error("Failed to parse config: {0}")]
    ParseFailed(String),

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(#[source] std::io::Error),
}

/// Idle sensor errors.
#[derive(Error, Debug)]
pub enum IdleError {
    /// The platform sensor could not be queried
    #[error("idle sensor unavailable: {0}")]
    Unavailable(String),
}

/// Hotkey parsing errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum HotkeyError {
    #[error("hotkey is empty")]
    Empty,

    #[error("hotkey '{0}' contains an empty key")]
    EmptyPart(String),
}

/// Early-unlock gate errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RestError {
    /// Early unlock is disabled in the configuration
    #[error("early unlock is not allowed")]
    NotAllowed,

    /// The typed phrase did not match
    #[error("unlock phrase does not match")]
    WrongPhrase,

    /// No rest session is running
    #[error("rest session is not active")]
    NotActive,
}

/// Result type alias for core operations.
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

impl ConfigError {
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}
