//! Error types for the publishing crate.

use std::path::PathBuf;

use thiserror::Error;

use geoserver_client::GeoServerError;
use grass_store::StoreError;
use publish_common::{ColorRampError, DegenerateRange, TargetError};

/// Errors that can occur while publishing.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Color range {0} not known")]
    UnknownColor(String),

    #[error("Dataset <{0}> not found in the current mapset")]
    DatasetNotFound(String),

    #[error("Dataset <{0}> exists as raster and as STRDS, set the dataset type explicitly")]
    AmbiguousDataset(String),

    #[error("Invalid transport configuration: {0}")]
    InvalidTransport(String),

    #[error(transparent)]
    DegenerateRange(#[from] DegenerateRange),

    #[error("STRDS <{0}> has no registered maps")]
    EmptySeries(String),

    #[error("GeoServer path points at location <{found}> but the current location is <{expected}>")]
    LocationMismatch { expected: String, found: String },

    #[error(transparent)]
    InvalidTarget(#[from] TargetError),

    #[error("Output path {0} already exists and is not empty")]
    DirectoryConflict(PathBuf),

    #[error("Malformed style document: {0}")]
    Style(String),

    #[error("Failed to build archive: {0}")]
    Archive(String),

    #[error("Raster store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    GeoServer(#[from] GeoServerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PublishError {
    /// Whether the error was raised before any remote call was made.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            PublishError::UnknownColor(_)
                | PublishError::DatasetNotFound(_)
                | PublishError::AmbiguousDataset(_)
                | PublishError::InvalidTransport(_)
                | PublishError::DegenerateRange(_)
                | PublishError::EmptySeries(_)
                | PublishError::LocationMismatch { .. }
                | PublishError::InvalidTarget(_)
        )
    }
}

impl From<ColorRampError> for PublishError {
    fn from(err: ColorRampError) -> Self {
        match err {
            ColorRampError::UnknownRamp(name) => PublishError::UnknownColor(name),
            other => PublishError::Store(StoreError::parse("r.colors", other.to_string())),
        }
    }
}

/// Result type for publishing operations.
pub type Result<T> = std::result::Result<T, PublishError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_classification() {
        assert!(PublishError::UnknownColor("x".into()).is_precondition());
        assert!(PublishError::EmptySeries("s".into()).is_precondition());
        assert!(!PublishError::DirectoryConflict(PathBuf::from("/tmp/x")).is_precondition());
        assert!(!PublishError::Archive("too large".into()).is_precondition());
    }

    #[test]
    fn test_unknown_ramp_maps_to_unknown_color() {
        let err: PublishError = ColorRampError::UnknownRamp("purple".into()).into();
        assert_eq!(err.to_string(), "Color range purple not known");
        assert!(err.is_precondition());
    }
}
