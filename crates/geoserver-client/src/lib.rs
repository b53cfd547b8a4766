//! GeoServer REST resource protocol.
//!
//! Creates the resources behind a published raster layer in order:
//! workspace, coverage store, coverage, style. Workspace creation is
//! idempotent; every other unexpected status is fatal.

mod client;
pub mod error;
pub mod payload;

pub use client::{GeoServerClient, GeoServerConfig, UploadKind, WorkspaceOutcome, SLD_CONTENT_TYPE};
pub use error::{GeoServerError, GeoServerResult};
pub use payload::{Coverage, CoverageStore, StoreType};
