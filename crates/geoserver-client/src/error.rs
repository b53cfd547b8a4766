//! Error types for the GeoServer REST client.

use thiserror::Error;

/// Result type for GeoServer operations.
pub type GeoServerResult<T> = Result<T, GeoServerError>;

/// Errors returned by GeoServer REST calls.
#[derive(Error, Debug)]
pub enum GeoServerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a status code the protocol does not accept
    #[error("{operation} failed! <{status}> <{body}>")]
    UnexpectedStatus {
        operation: String,
        status: u16,
        body: String,
    },

    /// Reading a file to upload failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Response body lacks a field the protocol relies on
    #[error("Unexpected response from {operation}: {message}")]
    InvalidResponse { operation: String, message: String },
}

impl GeoServerError {
    /// HTTP status code, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            GeoServerError::UnexpectedStatus { status, .. } => Some(*status),
            GeoServerError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
