//! Publishing through GeoServer's GRASS coverage store.
//!
//! The layer reads the mapset in place; nothing is exported or uploaded.

use tracing::{info, instrument};

use geoserver_client::{Coverage, CoverageStore, GeoServerClient, StoreType};
use grass_store::parse::strip_mapset;
use grass_store::RasterStore;
use publish_common::{DatasetKind, DatasetType};

use crate::error::{PublishError, Result};
use crate::resolve::resolve_dataset;

/// Options of the `publish-grass` command.
#[derive(Debug, Clone)]
pub struct GrassLayerOptions {
    /// Raster or STRDS name, optionally with `@mapset`
    pub input: String,
    pub dataset_type: DatasetType,
    pub store_name: String,
    pub layer: String,
    /// Defaults to the layer name
    pub title: Option<String>,
    /// GeoServer-side path of the mapset, `.../<location>/<mapset>`
    pub gs_file_path: String,
}

/// What [`publish_grass_layer`] created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrassLayerReport {
    pub layer: String,
    pub kind: DatasetKind,
    pub store_url: String,
}

/// Location component of a mapset path (second to last).
fn location_of(gs_file_path: &str) -> Option<&str> {
    gs_file_path
        .trim_end_matches('/')
        .rsplit('/')
        .nth(1)
        .filter(|s| !s.is_empty())
}

#[instrument(skip_all, fields(input = %options.input, layer = %options.layer))]
pub async fn publish_grass_layer<S: RasterStore + ?Sized>(
    store: &S,
    client: &GeoServerClient,
    options: &GrassLayerOptions,
) -> Result<GrassLayerReport> {
    let location = store.current_location().await?;
    let found = location_of(&options.gs_file_path).unwrap_or_default();
    if found != location {
        return Err(PublishError::LocationMismatch {
            expected: location,
            found: found.to_string(),
        });
    }

    let name = strip_mapset(&options.input).to_string();
    let kind = resolve_dataset(store, &name, options.dataset_type).await?;
    let mapset = store.current_mapset().await?;
    let epsg = store.projection_epsg().await?;

    let root = options.gs_file_path.trim_end_matches('/');
    let store_path = match kind {
        DatasetKind::Strds => format!("{}/tgis/sqlite.db", root),
        DatasetKind::Raster => format!("{}/cellhd/{}", root, name),
    };

    client.create_workspace().await?;

    let coverage_store = CoverageStore::new(
        &options.store_name,
        StoreType::Grass,
        client.workspace(),
        &store_path,
    );
    let store_url = coverage_store.url.clone();
    client.create_coverage_store(coverage_store).await?;

    let title = options.title.as_deref().unwrap_or(&options.layer);
    let coverage = Coverage::grass_layer(
        &options.layer,
        title,
        client.workspace(),
        &options.store_name,
        &format!("{}@{}", name, mapset),
        epsg,
        kind == DatasetKind::Strds,
    );
    client.create_coverage(&options.store_name, coverage).await?;

    info!(kind = %kind, store_url = %store_url, "Published GRASS layer");
    Ok(GrassLayerReport {
        layer: options.layer.clone(),
        kind,
        store_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_of() {
        assert_eq!(
            location_of("/data/grassdata/nc_spm_08_grass7/PERMANENT"),
            Some("nc_spm_08_grass7")
        );
        assert_eq!(location_of("/data/nc/user1/"), Some("nc"));
        assert_eq!(location_of("PERMANENT"), None);
    }
}
