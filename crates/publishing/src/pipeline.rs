//! Pipeline driver for temporal raster publishing.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use geoserver_client::{Coverage, CoverageStore, GeoServerClient, StoreType, UploadKind};
use grass_store::parse::strip_mapset;
use grass_store::RasterStore;
use publish_common::{
    discrete_layer_names, ColorRampRange, EpsgCode, PublishTarget, TemporalRasterSeries,
};

use crate::archive::zip_directory;
use crate::config::{PublishOptions, TransportMode};
use crate::error::{PublishError, Result};
use crate::mosaic::{export_granules, prepare_target_dir, write_aux_files};
use crate::rescale::{compute_transform, rescale_series};
use crate::scope::RunScope;
use crate::styling::style_layers;

/// Summary of a successful `publish-strds` run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PublishReport {
    /// Published layer names, in series order for discrete layers
    pub layers: Vec<String>,
    /// Input STRDS
    pub dataset: String,
    pub transport: String,
    /// Exported file names
    pub exported_files: Vec<String>,
    /// Uploaded mosaic archive, if one was built
    pub archive: Option<PathBuf>,
    pub archive_entries: Vec<String>,
    pub rescaled: bool,
    pub styled: bool,
}

impl PublishReport {
    /// Line printed by the CLI on success.
    pub fn summary(&self) -> String {
        format!(
            "Published layer/s {} from STRDS {}.",
            self.layers.join(", "),
            self.dataset
        )
    }
}

/// Files staged locally for one publish target.
#[derive(Debug, Default)]
struct Staged {
    layers: Vec<String>,
    files: Vec<String>,
    /// (path, entries) of a built mosaic archive
    archive: Option<(PathBuf, Vec<String>)>,
    /// Local paths of discrete GeoTIFFs, parallel to `layers`
    local_files: Vec<PathBuf>,
    /// Mosaic directory relative to the data directory
    mosaic_dir: Option<String>,
}

/// Publishes temporal raster datasets from a raster store to GeoServer.
pub struct Publisher<S: RasterStore + ?Sized> {
    store: Arc<S>,
    client: GeoServerClient,
}

impl<S: RasterStore + ?Sized> Publisher<S> {
    pub fn new(store: Arc<S>, client: GeoServerClient) -> Self {
        Self { store, client }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn client(&self) -> &GeoServerClient {
        &self.client
    }

    /// Publish an STRDS as discrete layers or as one time-enabled mosaic.
    ///
    /// Temporary grids, the saved region and staging paths are released
    /// whether the run succeeds or fails.
    #[instrument(skip_all, fields(strds = %options.input, transport = options.transport.kind()))]
    pub async fn publish_strds(&self, options: &PublishOptions) -> Result<PublishReport> {
        let mut scope = RunScope::new();
        let result = self.run(options, &mut scope).await;

        let outcome = scope.teardown(self.store.as_ref()).await;
        if outcome.failures > 0 {
            warn!(failures = outcome.failures, "Cleanup was incomplete");
        }

        result
    }

    async fn run(&self, options: &PublishOptions, scope: &mut RunScope) -> Result<PublishReport> {
        let store = self.store.as_ref();

        // Preconditions: nothing is exported or sent before these pass.
        let ramp = match options.color.as_deref() {
            Some(color) => store.color_ramps().await?.resolve(Some(color))?,
            None => None,
        };
        let series = self.load_series(&options.input).await?;

        scope.save_region(store).await?;

        let (series, rescaled) = match &ramp {
            Some(_) => {
                let transform = compute_transform(store, &series).await?;
                (rescale_series(store, &series, &transform, scope).await?, true)
            }
            None => (series, false),
        };

        let epsg = store.projection_epsg().await?;

        if let TransportMode::UploadPackage { staging_dir } = &options.transport {
            scope.track_dir(staging_dir);
            tokio::fs::create_dir_all(staging_dir).await?;
        }

        let mut staged = match &options.target {
            PublishTarget::DiscreteLayers { prefix } => {
                self.stage_discrete(&series, prefix, &options.transport).await?
            }
            PublishTarget::MosaicLayer { name } => {
                self.stage_mosaic(&series, name, &options.transport).await?
            }
        };

        self.client.create_workspace().await?;

        match &options.target {
            PublishTarget::DiscreteLayers { .. } => {
                self.register_discrete(&staged, &options.transport, epsg).await?
            }
            PublishTarget::MosaicLayer { name } => {
                let store_name = format!("{}_coverage_{}", name, scope.run_id());
                self.register_mosaic(&staged, name, &store_name, &options.transport, epsg)
                    .await?
            }
        }

        let styled = match &ramp {
            Some((ramp, range)) => {
                self.style(&series, ramp, *range, &staged.layers, options.nodata_entry)
                    .await?;
                true
            }
            None => false,
        };

        let report = PublishReport {
            layers: staged.layers,
            dataset: options.input.clone(),
            transport: options.transport.kind().to_string(),
            exported_files: staged.files,
            archive: staged.archive.as_ref().map(|(path, _)| path.clone()),
            archive_entries: staged
                .archive
                .map(|(_, entries)| entries)
                .unwrap_or_default(),
            rescaled,
            styled,
        };
        info!(layers = ?report.layers, "Publishing finished");
        Ok(report)
    }

    async fn load_series(&self, input: &str) -> Result<TemporalRasterSeries> {
        let name = strip_mapset(input);
        if !self.store.list_strds().await?.iter().any(|s| s == name) {
            return Err(PublishError::DatasetNotFound(name.to_string()));
        }

        let timesteps = self.store.list_timesteps(name).await?;
        if timesteps.is_empty() {
            return Err(PublishError::EmptySeries(name.to_string()));
        }

        info!(maps = timesteps.len(), "Loaded STRDS");
        Ok(TemporalRasterSeries::new(name, timesteps))
    }

    /// Export one GeoTIFF per timestep, named after its layer.
    async fn stage_discrete(
        &self,
        series: &TemporalRasterSeries,
        prefix: &str,
        transport: &TransportMode,
    ) -> Result<Staged> {
        let dir = transport.local_data_dir();
        tokio::fs::create_dir_all(&dir).await?;

        let layers = discrete_layer_names(prefix, series.len());
        let mut staged = Staged::default();

        for (step, layer) in series.timesteps.iter().zip(&layers) {
            let file = format!("{}.tif", layer);
            let path = dir.join(&file);
            if tokio::fs::try_exists(&path).await? {
                return Err(PublishError::DirectoryConflict(path));
            }

            self.store.set_region_to_raster(&step.map_name).await?;
            self.store.export_cog(&step.map_name, &path).await?;
            info!(map = %step.map_name, layer = %layer, "Exported layer file");

            staged.files.push(file);
            staged.local_files.push(path);
        }

        staged.layers = layers;
        Ok(staged)
    }

    /// Lay out granules and descriptors; in upload mode also build the archive.
    async fn stage_mosaic(
        &self,
        series: &TemporalRasterSeries,
        name: &str,
        transport: &TransportMode,
    ) -> Result<Staged> {
        let mosaic_root = transport.local_data_dir().join(name);

        let (granule_dir, relative) = match transport {
            TransportMode::SharedPath { .. } => (mosaic_root.clone(), name.to_string()),
            TransportMode::UploadPackage { .. } => {
                let id = Uuid::new_v4().simple().to_string();
                (mosaic_root.join(&id), format!("{}/{}", name, id))
            }
        };

        prepare_target_dir(&granule_dir).await?;
        let files = export_granules(self.store.as_ref(), series, &granule_dir).await?;
        write_aux_files(&granule_dir).await?;

        let archive = match transport {
            TransportMode::SharedPath { .. } => None,
            TransportMode::UploadPackage { .. } => {
                let path = mosaic_root.join(format!("{}.zip", Uuid::new_v4().simple()));
                let entries = zip_directory(granule_dir.clone(), path.clone()).await?;
                Some((path, entries))
            }
        };

        Ok(Staged {
            layers: vec![name.to_string()],
            files,
            archive,
            local_files: Vec::new(),
            mosaic_dir: Some(relative),
        })
    }

    async fn register_discrete(
        &self,
        staged: &Staged,
        transport: &TransportMode,
        epsg: EpsgCode,
    ) -> Result<()> {
        for ((layer, file), local) in staged.layers.iter().zip(&staged.files).zip(&staged.local_files) {
            let store_name = format!("{}_store", layer);

            match transport.server_path(file) {
                Some(server_path) => {
                    let store = CoverageStore::new(
                        &store_name,
                        StoreType::GeoTIFF,
                        self.client.workspace(),
                        &server_path,
                    );
                    self.client.create_coverage_store(store).await?;
                    let coverage = Coverage::granule_layer(
                        layer,
                        self.client.workspace(),
                        &store_name,
                        epsg,
                        false,
                    );
                    self.client.create_coverage(&store_name, coverage).await?;
                }
                None => {
                    self.client
                        .upload_store_file(&store_name, UploadKind::GeoTiff, local, Some(layer))
                        .await?;
                }
            }
            info!(layer = %layer, "Published layer");
        }
        Ok(())
    }

    async fn register_mosaic(
        &self,
        staged: &Staged,
        name: &str,
        store_name: &str,
        transport: &TransportMode,
        epsg: EpsgCode,
    ) -> Result<()> {
        let coverage = Coverage::granule_layer(name, self.client.workspace(), store_name, epsg, true);

        match (&staged.archive, transport) {
            (Some((archive, _)), TransportMode::UploadPackage { .. }) => {
                self.client
                    .upload_store_file(store_name, UploadKind::ImageMosaic, archive, None)
                    .await?;
                // The upload created the coverage under the store's name.
                self.client
                    .update_coverage(store_name, store_name, coverage)
                    .await?;
            }
            _ => {
                let relative = staged.mosaic_dir.as_deref().unwrap_or(name);
                let server_path = transport.server_path(relative).ok_or_else(|| {
                    PublishError::InvalidTransport("mosaic archive missing in upload mode".to_string())
                })?;
                let store = CoverageStore::new(
                    store_name,
                    StoreType::ImageMosaic,
                    self.client.workspace(),
                    &server_path,
                );
                self.client.create_coverage_store(store).await?;
                self.client.create_coverage(store_name, coverage).await?;
            }
        }

        info!(layer = %name, store = %store_name, "Published mosaic layer");
        Ok(())
    }

    async fn style(
        &self,
        series: &TemporalRasterSeries,
        ramp: &str,
        range: ColorRampRange,
        layers: &[String],
        nodata_entry: bool,
    ) -> Result<()> {
        let Some(reference) = series.map_names().next() else {
            return Err(PublishError::EmptySeries(series.name.clone()));
        };
        style_layers(
            self.store.as_ref(),
            &self.client,
            reference,
            ramp,
            range,
            layers,
            nodata_entry,
        )
        .await
    }
}
