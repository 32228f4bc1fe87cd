//! Error types for reactor-core

use std::path::PathBuf;

/// Result type for reactor-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by the remote configuration service
#[derive(Debug, Clone, thiserror::Error)]
pub enum RemoteError {
    /// The service answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The request never produced a response
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// HTTP status of the failure, if the service answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the service rejected the call with 429 Too Many Requests
    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }
}

/// Errors that can occur in reactor-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or invalid settings; raised before any remote call
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Settings file not found at expected path
    #[error("Settings file not found at {path}")]
    SettingsNotFound { path: PathBuf },

    /// A page request was rate limited again after its retry
    #[error("Rate limited while fetching {operation}")]
    RateLimited { operation: String },

    /// A remote call failed
    #[error("{operation} failed: {source}")]
    Remote {
        operation: String,
        #[source]
        source: RemoteError,
    },

    /// Ledger could not be read or written
    #[error("Ledger error: {message}")]
    Ledger { message: String },

    /// Filesystem error from reactor-fs
    #[error(transparent)]
    Fs(#[from] reactor_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn remote(operation: impl Into<String>, source: RemoteError) -> Self {
        Self::Remote {
            operation: operation.into(),
            source,
        }
    }
}
