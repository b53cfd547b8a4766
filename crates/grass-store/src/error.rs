//! Error types for raster store access.

use thiserror::Error;

/// Result type for raster store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the raster store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to spawn a module
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Module exited unsuccessfully
    #[error("Module {module} failed ({status}): {stderr}")]
    CommandFailed {
        module: String,
        status: String,
        stderr: String,
    },

    /// Module output could not be interpreted
    #[error("Unexpected output from {module}: {message}")]
    Parse { module: String, message: String },

    /// Requested dataset is missing
    #[error("Dataset <{0}> does not exist")]
    NotFound(String),
}

impl StoreError {
    pub fn parse(module: &str, message: impl Into<String>) -> Self {
        StoreError::Parse {
            module: module.to_string(),
            message: message.into(),
        }
    }
}
