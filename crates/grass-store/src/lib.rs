//! Access to the raster store behind the publishing pipeline.
//!
//! The store owns the grids, their temporal registration, the computational
//! region and the color tables. [`RasterStore`] is the seam the pipeline
//! talks to; [`GrassCli`] implements it by running GRASS GIS modules.

pub mod error;
mod grass;
pub mod parse;

use std::path::Path;

use async_trait::async_trait;

use publish_common::{ColorRampTable, EpsgCode, RescaleTransform, Timestep};

pub use error::{StoreError, StoreResult};
pub use grass::{mapcalc_rescale_expression, GrassCli};

/// Operations the pipeline needs from the raster store.
#[async_trait]
pub trait RasterStore: Send + Sync {
    /// Names of the temporal raster datasets in the current mapset.
    async fn list_strds(&self) -> StoreResult<Vec<String>>;

    /// Names of the raster maps in the current mapset.
    async fn list_rasters(&self) -> StoreResult<Vec<String>>;

    /// Name of the current mapset.
    async fn current_mapset(&self) -> StoreResult<String>;

    /// Name of the current location.
    async fn current_location(&self) -> StoreResult<String>;

    /// Registered maps of a temporal dataset with their start times, in time order.
    async fn list_timesteps(&self, strds: &str) -> StoreResult<Vec<Timestep>>;

    /// Registered map names of a temporal dataset, in time order.
    async fn list_map_names(&self, strds: &str) -> StoreResult<Vec<String>>;

    /// Percentile values of a single grid, ignoring no-data cells.
    async fn percentiles(&self, map: &str, percentiles: &[f64]) -> StoreResult<Vec<f64>>;

    /// Write `output` as `input` rescaled by `transform`.
    async fn rescale(&self, input: &str, output: &str, transform: &RescaleTransform) -> StoreResult<()>;

    /// Align the computational region with a grid.
    async fn set_region_to_raster(&self, map: &str) -> StoreResult<()>;

    /// Save the current region under a name.
    async fn save_region(&self, name: &str) -> StoreResult<()>;

    /// Restore a saved region if it still exists; returns whether it did.
    async fn restore_region(&self, name: &str) -> StoreResult<bool>;

    /// Remove a saved region.
    async fn remove_region(&self, name: &str) -> StoreResult<()>;

    /// Remove a raster map if it exists; returns whether it did.
    async fn remove_raster(&self, name: &str) -> StoreResult<bool>;

    /// Known color ramps and their data ranges.
    async fn color_ramps(&self) -> StoreResult<ColorRampTable>;

    /// Assign a named color ramp to a grid, optionally offset and scaled.
    async fn apply_colors(&self, map: &str, ramp: &str, offset_scale: Option<(f64, f64)>) -> StoreResult<()>;

    /// Export a grid as a cloud-optimized GeoTIFF with overviews.
    async fn export_cog(&self, map: &str, path: &Path) -> StoreResult<()>;

    /// Style document (SLD) generated from a grid's color table.
    async fn style_document(&self, map: &str) -> StoreResult<String>;

    /// EPSG code of the current location's projection.
    async fn projection_epsg(&self) -> StoreResult<EpsgCode>;
}
