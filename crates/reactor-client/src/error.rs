//! Error types for the Reactor client

use reactor_core::RemoteError;
use thiserror::Error;

/// Reactor client error
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// A configured value cannot be sent as a header
    #[error("Invalid header value for {0}")]
    InvalidHeader(&'static str),

    /// Response did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

impl From<ClientError> for RemoteError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Server { status, message } => RemoteError::Status { status, message },
            ClientError::Http(e) => match e.status() {
                Some(status) => RemoteError::Status {
                    status: status.as_u16(),
                    message: e.to_string(),
                },
                None if e.is_decode() => RemoteError::InvalidResponse(e.to_string()),
                None => RemoteError::Transport(e.to_string()),
            },
            ClientError::Json(e) => RemoteError::InvalidResponse(e.to_string()),
            ClientError::InvalidResponse(message) => RemoteError::InvalidResponse(message),
            ClientError::InvalidHeader(name) => {
                RemoteError::Transport(format!("invalid header value for {name}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_keeps_status() {
        let remote: RemoteError = ClientError::Server {
            status: 429,
            message: "slow down".into(),
        }
        .into();
        assert!(remote.is_rate_limited());
    }

    #[test]
    fn test_invalid_response_maps_to_invalid_response() {
        let remote: RemoteError = ClientError::InvalidResponse("no data".into()).into();
        assert!(matches!(remote, RemoteError::InvalidResponse(_)));
        assert_eq!(remote.status(), None);
    }
}
