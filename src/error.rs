//! Unified error types for Lookout

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Exit code for a missing or invalid configuration
pub const EXIT_CONFIG: i32 = 2;

/// Exit code when another invocation holds the state lock
pub const EXIT_BUSY: i32 = 3;

/// Main error type for Lookout operations
#[derive(Error, Debug)]
pub enum Error {
    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // Config errors
    #[error("Failed to read config file '{path}': {source}")]
    ConfigRead { path: PathBuf, source: io::Error },

    #[error("Failed to parse config: {0}")]
    ConfigParse(String),

    #[error("Config validation failed: {0}")]
    ConfigValidation(String),

    // State errors
    #[error("Failed to write state file '{path}': {source}")]
    StateWrite { path: PathBuf, source: io::Error },

    #[error("Failed to encode state: {0}")]
    StateEncode(#[from] serde_json::Error),

    #[error("State file '{0}' is locked by another invocation")]
    StateLocked(PathBuf),

    // Action errors
    #[error("Notification failed: {0}")]
    Notify(String),

    #[error("Restart command failed: {0}")]
    Restart(String),
}

impl Error {
    /// Process exit code for an invocation that ended with this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ConfigRead { .. } | Error::ConfigParse(_) | Error::ConfigValidation(_) => {
                EXIT_CONFIG
            }
            Error::StateLocked(_) => EXIT_BUSY,
            _ => 1,
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::ConfigParse(e.to_string())
    }
}

/// Result type alias for Lookout operations
pub type Result<T> = std::result::Result<T, Error>;
