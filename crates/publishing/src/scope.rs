//! Run-scoped resource tracking.
//!
//! Everything a run creates that must not outlive it (rescaled grids, the
//! saved region and staging directories) is registered here and
//! released by a single [`RunScope::teardown`] call on every exit path.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use grass_store::RasterStore;

/// Counts reported by [`RunScope::teardown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownOutcome {
    pub rasters_removed: usize,
    pub paths_removed: usize,
    pub region_restored: bool,
    pub failures: usize,
}

/// Tracker for a run's temporary resources.
#[derive(Debug)]
pub struct RunScope {
    run_id: u32,
    rasters: Vec<String>,
    region: Option<String>,
    dirs: Vec<PathBuf>,
}

impl Default for RunScope {
    fn default() -> Self {
        Self::new()
    }
}

impl RunScope {
    pub fn new() -> Self {
        Self::with_run_id(std::process::id())
    }

    pub fn with_run_id(run_id: u32) -> Self {
        Self {
            run_id,
            rasters: Vec::new(),
            region: None,
            dirs: Vec::new(),
        }
    }

    /// Suffix that keeps this run's temporary names apart from other runs.
    pub fn run_id(&self) -> u32 {
        self.run_id
    }

    /// Name of the rescaled copy of `map`.
    pub fn rescaled_name(&self, map: &str) -> String {
        format!("{}_255_{}", map, self.run_id)
    }

    pub fn track_raster(&mut self, name: impl Into<String>) {
        self.rasters.push(name.into());
    }

    pub fn track_dir(&mut self, dir: impl AsRef<Path>) {
        self.dirs.push(dir.as_ref().to_path_buf());
    }

    pub fn tracked_rasters(&self) -> &[String] {
        &self.rasters
    }

    /// Save the current region so teardown can restore it.
    pub async fn save_region<S: RasterStore + ?Sized>(&mut self, store: &S) -> grass_store::StoreResult<()> {
        let name = format!("cur_region_{}", self.run_id);
        store.save_region(&name).await?;
        debug!(region = %name, "Saved current region");
        self.region = Some(name);
        Ok(())
    }

    /// Release everything tracked. Failures are logged and counted, never raised.
    pub async fn teardown<S: RasterStore + ?Sized>(self, store: &S) -> TeardownOutcome {
        let mut outcome = TeardownOutcome::default();

        for raster in &self.rasters {
            match store.remove_raster(raster).await {
                Ok(true) => outcome.rasters_removed += 1,
                Ok(false) => debug!(raster = %raster, "Temporary raster already gone"),
                Err(e) => {
                    warn!(raster = %raster, error = %e, "Failed to remove temporary raster");
                    outcome.failures += 1;
                }
            }
        }

        if let Some(region) = &self.region {
            match store.restore_region(region).await {
                Ok(restored) => outcome.region_restored = restored,
                Err(e) => {
                    warn!(region = %region, error = %e, "Failed to restore region");
                    outcome.failures += 1;
                }
            }
            if let Err(e) = store.remove_region(region).await {
                warn!(region = %region, error = %e, "Failed to remove saved region");
                outcome.failures += 1;
            }
        }

        for dir in &self.dirs {
            match tokio::fs::remove_dir_all(dir).await {
                Ok(()) => outcome.paths_removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %dir.display(), error = %e, "Failed to remove directory");
                    outcome.failures += 1;
                }
            }
        }

        debug!(?outcome, "Run scope released");
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::FakeRasterStore;

    #[tokio::test]
    async fn test_teardown_releases_everything() {
        let store = FakeRasterStore::new().with_raster("lst_255_7", vec![Some(1.0)]);
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("staging");
        std::fs::create_dir_all(staging.join("nested")).unwrap();
        std::fs::write(staging.join("nested").join("archive.zip"), b"zip").unwrap();
        let elsewhere = dir.path().join("gone");

        let mut scope = RunScope::with_run_id(7);
        scope.save_region(&store).await.unwrap();
        scope.track_raster("lst_255_7");
        scope.track_raster("never_created_255_7");
        scope.track_dir(&staging);
        scope.track_dir(&elsewhere);

        let outcome = scope.teardown(&store).await;

        assert_eq!(outcome.rasters_removed, 1);
        assert_eq!(outcome.paths_removed, 1);
        assert!(outcome.region_restored);
        assert_eq!(outcome.failures, 0);
        assert!(store.raster("lst_255_7").is_none());
        assert!(store.regions().is_empty());
        assert!(!staging.exists());
        assert!(dir.path().exists());
    }

    #[tokio::test]
    async fn test_teardown_continues_after_failure() {
        let store = FakeRasterStore::new()
            .with_raster("a", vec![Some(1.0)])
            .with_raster("b", vec![Some(1.0)])
            .fail_on("remove_raster:a");

        let mut scope = RunScope::with_run_id(1);
        scope.save_region(&store).await.unwrap();
        scope.track_raster("a");
        scope.track_raster("b");

        let outcome = scope.teardown(&store).await;

        assert_eq!(outcome.failures, 1);
        assert_eq!(outcome.rasters_removed, 1);
        assert!(store.called("restore_region:cur_region_1"));
        assert!(store.called("remove_region:cur_region_1"));
    }

    #[test]
    fn test_rescaled_name() {
        let scope = RunScope::with_run_id(4242);
        assert_eq!(scope.rescaled_name("lst_2015_01"), "lst_2015_01_255_4242");
    }
}
