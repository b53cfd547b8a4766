//! Temporal raster publishing.
//!
//! Publishes a temporal raster dataset (STRDS) from the raster store to
//! GeoServer, either as one layer per timestep or as a single time-enabled
//! image mosaic.
//!
//! # Architecture
//!
//! A run is driven by [`Publisher::publish_strds`]:
//!
//! - color ramp and dataset preconditions are checked first
//! - maps are rescaled onto `[1, 255]` with one series-wide transform
//! - files are written to the shared data path, or staged and archived
//!   for upload, depending on the [`TransportMode`]
//! - workspace, store, coverage and style are created on GeoServer
//! - temporary grids, the saved region and staging paths are released
//!   through a [`RunScope`] on every exit path

pub mod archive;
pub mod config;
pub mod error;
mod grass_layer;
pub mod mosaic;
mod pipeline;
pub mod rescale;
mod resolve;
pub mod scope;
pub mod styling;

// Re-exports
pub use config::{PublishOptions, TransportMode};
pub use error::{PublishError, Result};
pub use grass_layer::{publish_grass_layer, GrassLayerOptions, GrassLayerReport};
pub use pipeline::{PublishReport, Publisher};
pub use resolve::resolve_dataset;
pub use scope::{RunScope, TeardownOutcome};
pub use styling::{postprocess_style, style_existing_layer, StyleOptions};
