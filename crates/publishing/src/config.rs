//! Run configuration: transport selection and publish options.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use publish_common::PublishTarget;

use crate::error::{PublishError, Result};

/// Directory (relative to the data root) that published files live under.
pub const GEODATA_DIR: &str = "geodata";

/// How raster payloads reach the tile server. Fixed once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportMode {
    /// Files are written where GeoServer reads them in place.
    SharedPath {
        /// Local view of the shared directory
        local_root: PathBuf,
        /// The same directory as seen by GeoServer
        server_root: String,
    },
    /// Files are staged privately, archived and uploaded.
    UploadPackage { staging_dir: PathBuf },
}

impl TransportMode {
    /// Select the transport from the shared data path and output folder settings.
    ///
    /// A data path needs an existing output folder (its local view). Without a
    /// data path a fresh staging directory under the output folder, or the
    /// system temp dir, is used.
    pub fn from_settings(datapath: Option<&str>, output_folder: Option<&Path>) -> Result<Self> {
        let datapath = datapath.map(str::trim).filter(|p| !p.is_empty());

        match (datapath, output_folder) {
            (Some(server_root), Some(local_root)) => {
                if !local_root.is_dir() {
                    return Err(PublishError::InvalidTransport(format!(
                        "output folder {} does not exist",
                        local_root.display()
                    )));
                }
                Ok(TransportMode::SharedPath {
                    local_root: local_root.to_path_buf(),
                    server_root: server_root.trim_end_matches('/').to_string(),
                })
            }
            (Some(_), None) => Err(PublishError::InvalidTransport(
                "GEOSERVER_DATAPATH is set but OUTPUTFOLDER is not".to_string(),
            )),
            (None, output_folder) => {
                let parent = output_folder
                    .map(Path::to_path_buf)
                    .unwrap_or_else(std::env::temp_dir);
                Ok(TransportMode::UploadPackage {
                    staging_dir: parent.join(format!("geoserver-publish-{}", Uuid::new_v4())),
                })
            }
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, TransportMode::SharedPath { .. })
    }

    /// Short name used in logs and the run report.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportMode::SharedPath { .. } => "shared-path",
            TransportMode::UploadPackage { .. } => "upload-package",
        }
    }

    /// Local directory exported files are written to.
    pub fn local_data_dir(&self) -> PathBuf {
        match self {
            TransportMode::SharedPath { local_root, .. } => local_root.join(GEODATA_DIR),
            TransportMode::UploadPackage { staging_dir } => staging_dir.join(GEODATA_DIR),
        }
    }

    /// GeoServer-side path of `relative` below the data directory.
    ///
    /// Only meaningful for the shared path; staged files are uploaded instead.
    pub fn server_path(&self, relative: &str) -> Option<String> {
        match self {
            TransportMode::SharedPath { server_root, .. } => {
                Some(format!("{}/{}/{}", server_root, GEODATA_DIR, relative))
            }
            TransportMode::UploadPackage { .. } => None,
        }
    }
}

/// Options of one `publish-strds` run.
#[derive(Debug, Clone)]
pub struct PublishOptions {
    /// Name of the temporal raster dataset
    pub input: String,
    pub target: PublishTarget,
    /// Color ramp name; `None` or `default` skips rescaling and styling
    pub color: Option<String>,
    pub transport: TransportMode,
    /// Insert the transparent quantity-0 entry into generated styles
    pub nodata_entry: bool,
}

impl PublishOptions {
    pub fn new(input: impl Into<String>, target: PublishTarget, transport: TransportMode) -> Self {
        Self {
            input: input.into(),
            target,
            color: None,
            transport,
            nodata_entry: true,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_path_selected_when_datapath_set() {
        let dir = tempfile::tempdir().unwrap();
        let mode = TransportMode::from_settings(Some("/opt/geoserver/data/"), Some(dir.path())).unwrap();

        assert!(mode.is_shared());
        assert_eq!(mode.local_data_dir(), dir.path().join("geodata"));
        assert_eq!(
            mode.server_path("lst").as_deref(),
            Some("/opt/geoserver/data/geodata/lst")
        );
    }

    #[test]
    fn test_datapath_without_output_folder_rejected() {
        let err = TransportMode::from_settings(Some("/data"), None).unwrap_err();
        assert!(matches!(err, PublishError::InvalidTransport(_)));
        assert!(err.is_precondition());
    }

    #[test]
    fn test_missing_output_folder_rejected() {
        let err = TransportMode::from_settings(Some("/data"), Some(Path::new("/nonexistent/out")))
            .unwrap_err();
        assert!(matches!(err, PublishError::InvalidTransport(_)));
    }

    #[test]
    fn test_empty_datapath_means_upload() {
        let dir = tempfile::tempdir().unwrap();
        let mode = TransportMode::from_settings(Some("  "), Some(dir.path())).unwrap();

        match &mode {
            TransportMode::UploadPackage { staging_dir } => {
                assert!(staging_dir.starts_with(dir.path()));
                let name = staging_dir.file_name().unwrap().to_string_lossy();
                assert!(name.starts_with("geoserver-publish-"));
            }
            other => panic!("unexpected mode: {:?}", other),
        }
        assert_eq!(mode.server_path("x"), None);
        assert_eq!(mode.kind(), "upload-package");
    }

    #[test]
    fn test_staging_dirs_are_unique() {
        let a = TransportMode::from_settings(None, None).unwrap();
        let b = TransportMode::from_settings(None, None).unwrap();
        assert_ne!(a, b);
    }
}
