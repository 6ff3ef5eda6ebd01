use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PkgBridgeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error at '{path}': {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    StdIoError(#[from] std::io::Error),

    #[error("KDL parse error: {0}")]
    KdlError(#[from] kdl::KdlError),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error("System command '{command}' failed: {reason}")]
    SystemCommandFailed { command: String, reason: String },

    #[error("Command '{command}' timed out after {seconds} seconds")]
    CommandTimedOut { command: String, seconds: u64 },

    /// Remote resource fetch error (HTTP, network, etc.)
    #[error("Failed to fetch remote resource: {0}")]
    RemoteFetchError(String),

    /// Lock acquisition failed (e.g., mutex poisoned, cache file locked)
    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("Invalid package identifier: {0}")]
    InvalidPackageId(String),

    #[error("Unknown backend: '{0}'. Valid backends: winget, choco, scoop, pip")]
    UnknownBackend(String),

    #[error("Backend '{0}' is disabled")]
    BackendDisabled(String),

    #[error("An operation on '{0}' is already in progress")]
    OperationInProgress(String),

    /// Path resolution or validation error
    #[error("Path error: {0}")]
    PathError(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, PkgBridgeError>;
