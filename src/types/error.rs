//! Error types for dirmirror

use std::path::PathBuf;
use thiserror::Error;

/// Error types for mirroring operations
#[derive(Debug, Error)]
pub enum MirrorError {
    /// Standard IO error (automatically converted via #[from])
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unknown severity name in the configuration
    #[error("log level is not set in config. Default log level ERROR (got {0:?})")]
    InvalidLogLevel(String),

    /// A walker could not list the root it was started on
    #[error("Cannot read walker root {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A directory below a walker root could not be listed
    #[error("Cannot list directory {path}: {source}")]
    Listing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Copying a file failed
    #[error("Copy {from} -> {to} failed: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Removing a slave entry failed
    #[error("Cannot remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A spawned file task panicked or was aborted
    #[error("File task failed: {0}")]
    Task(String),

    /// The critical signal fired; scanning stopped
    #[error("application is closed unexpectedly")]
    Halted,
}

impl MirrorError {
    /// Check if this error stops the scan loop
    pub fn is_critical(&self) -> bool {
        matches!(self, MirrorError::RootUnreadable { .. } | MirrorError::Halted)
    }

    /// Check if this error comes from configuration
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            MirrorError::Config(_) | MirrorError::InvalidLogLevel(_)
        )
    }
}
