//! Error types for the client-side session layer

use thiserror::Error;

/// Failures of the persisted session snapshot
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session snapshot is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Failures decoding token claims on the client
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ClaimsError {
    #[error("Token does not have three segments")]
    Malformed,

    #[error("Token payload is not valid base64url")]
    Encoding,

    #[error("Token payload is not a JSON object")]
    Payload,
}
