//! In-memory [`RasterStore`] for pipeline tests.
//!
//! Grids are plain vectors of optional cell values. Every call is appended
//! to a log so tests can assert on ordering and on what never happened.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use grass_store::{RasterStore, StoreError, StoreResult};
use publish_common::{
    parse_start_time, ColorRampTable, EpsgCode, RescaleTransform, Timestep,
};

use crate::fixtures::{RAMP_LISTING, SAMPLE_SLD};

type Grid = Vec<Option<f64>>;

#[derive(Debug)]
struct FakeState {
    mapset: String,
    location: String,
    epsg: EpsgCode,
    rasters: BTreeMap<String, Grid>,
    strds: BTreeMap<String, Vec<Timestep>>,
    ramps: ColorRampTable,
    regions: BTreeSet<String>,
    colors: HashMap<String, (String, Option<(f64, f64)>)>,
    style: String,
    fail_on: Option<String>,
    calls: Vec<String>,
}

/// Raster store fake backed by in-memory grids.
#[derive(Debug)]
pub struct FakeRasterStore {
    state: Mutex<FakeState>,
}

impl Default for FakeRasterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRasterStore {
    pub fn new() -> Self {
        let ramps = ColorRampTable::parse_listing(RAMP_LISTING).unwrap_or_default();
        Self {
            state: Mutex::new(FakeState {
                mapset: "PERMANENT".to_string(),
                location: "nc_spm_08_grass7".to_string(),
                epsg: EpsgCode(3358),
                rasters: BTreeMap::new(),
                strds: BTreeMap::new(),
                ramps,
                regions: BTreeSet::new(),
                colors: HashMap::new(),
                style: SAMPLE_SLD.to_string(),
                fail_on: None,
                calls: Vec::new(),
            }),
        }
    }

    fn with_state(self, f: impl FnOnce(&mut FakeState)) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub fn with_mapset(self, mapset: &str, location: &str) -> Self {
        self.with_state(|s| {
            s.mapset = mapset.to_string();
            s.location = location.to_string();
        })
    }

    pub fn with_epsg(self, epsg: u32) -> Self {
        self.with_state(|s| s.epsg = EpsgCode(epsg))
    }

    pub fn with_raster(self, name: &str, cells: Grid) -> Self {
        self.with_state(|s| {
            s.rasters.insert(name.to_string(), cells);
        })
    }

    /// Register a temporal dataset of `(map, start_time, cells)` entries.
    pub fn with_strds(self, name: &str, maps: Vec<(&str, &str, Grid)>) -> Self {
        self.with_state(|s| {
            let mut steps = Vec::new();
            for (map, start, cells) in maps {
                let start = parse_start_time(start).expect("valid start time in fixture");
                steps.push(Timestep::new(map, start));
                s.rasters.insert(map.to_string(), cells);
            }
            s.strds.insert(name.to_string(), steps);
        })
    }

    pub fn with_style(self, sld: &str) -> Self {
        self.with_state(|s| s.style = sld.to_string())
    }

    /// Make every call whose log entry starts with `op` fail.
    pub fn fail_on(self, op: &str) -> Self {
        self.with_state(|s| s.fail_on = Some(op.to_string()))
    }

    /// Log of calls made so far, e.g. `export_cog:lst_2015_01`.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Whether any logged call starts with `prefix`.
    pub fn called(&self, prefix: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(prefix))
    }

    pub fn raster(&self, name: &str) -> Option<Grid> {
        self.state.lock().unwrap().rasters.get(name).cloned()
    }

    pub fn raster_names(&self) -> Vec<String> {
        self.state.lock().unwrap().rasters.keys().cloned().collect()
    }

    pub fn regions(&self) -> Vec<String> {
        self.state.lock().unwrap().regions.iter().cloned().collect()
    }

    pub fn colors_of(&self, map: &str) -> Option<(String, Option<(f64, f64)>)> {
        self.state.lock().unwrap().colors.get(map).cloned()
    }

    fn record(&self, call: String) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        let fails = state
            .fail_on
            .as_deref()
            .is_some_and(|op| call.starts_with(op));
        state.calls.push(call.clone());
        if fails {
            return Err(StoreError::CommandFailed {
                module: call,
                status: "exit status: 1".to_string(),
                stderr: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn grid(&self, name: &str) -> StoreResult<Grid> {
        self.raster(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }
}

/// Nearest-rank percentile over the non-null cells.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = (p / 100.0 * (sorted.len() - 1) as f64).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

#[async_trait]
impl RasterStore for FakeRasterStore {
    async fn list_strds(&self) -> StoreResult<Vec<String>> {
        self.record("list_strds".to_string())?;
        Ok(self.state.lock().unwrap().strds.keys().cloned().collect())
    }

    async fn list_rasters(&self) -> StoreResult<Vec<String>> {
        self.record("list_rasters".to_string())?;
        Ok(self.raster_names())
    }

    async fn current_mapset(&self) -> StoreResult<String> {
        self.record("current_mapset".to_string())?;
        Ok(self.state.lock().unwrap().mapset.clone())
    }

    async fn current_location(&self) -> StoreResult<String> {
        self.record("current_location".to_string())?;
        Ok(self.state.lock().unwrap().location.clone())
    }

    async fn list_timesteps(&self, strds: &str) -> StoreResult<Vec<Timestep>> {
        self.record(format!("list_timesteps:{}", strds))?;
        self.state
            .lock()
            .unwrap()
            .strds
            .get(strds)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(strds.to_string()))
    }

    async fn list_map_names(&self, strds: &str) -> StoreResult<Vec<String>> {
        self.record(format!("list_map_names:{}", strds))?;
        self.state
            .lock()
            .unwrap()
            .strds
            .get(strds)
            .map(|steps| steps.iter().map(|t| t.map_name.clone()).collect())
            .ok_or_else(|| StoreError::NotFound(strds.to_string()))
    }

    async fn percentiles(&self, map: &str, percentiles: &[f64]) -> StoreResult<Vec<f64>> {
        self.record(format!("percentiles:{}", map))?;
        let mut values: Vec<f64> = self.grid(map)?.into_iter().flatten().collect();
        if values.is_empty() {
            return Err(StoreError::parse("r.quantile", format!("{} has no data cells", map)));
        }
        values.sort_by(|a, b| a.total_cmp(b));
        Ok(percentiles.iter().map(|p| percentile(&values, *p)).collect())
    }

    async fn rescale(&self, input: &str, output: &str, transform: &RescaleTransform) -> StoreResult<()> {
        self.record(format!("rescale:{}->{}", input, output))?;
        let rescaled = self
            .grid(input)?
            .into_iter()
            .map(|c| c.map(|v| transform.apply(v)))
            .collect();
        self.state
            .lock()
            .unwrap()
            .rasters
            .insert(output.to_string(), rescaled);
        Ok(())
    }

    async fn set_region_to_raster(&self, map: &str) -> StoreResult<()> {
        self.record(format!("set_region:{}", map))?;
        self.grid(map).map(|_| ())
    }

    async fn save_region(&self, name: &str) -> StoreResult<()> {
        self.record(format!("save_region:{}", name))?;
        self.state.lock().unwrap().regions.insert(name.to_string());
        Ok(())
    }

    async fn restore_region(&self, name: &str) -> StoreResult<bool> {
        self.record(format!("restore_region:{}", name))?;
        Ok(self.state.lock().unwrap().regions.contains(name))
    }

    async fn remove_region(&self, name: &str) -> StoreResult<()> {
        self.record(format!("remove_region:{}", name))?;
        self.state.lock().unwrap().regions.remove(name);
        Ok(())
    }

    async fn remove_raster(&self, name: &str) -> StoreResult<bool> {
        self.record(format!("remove_raster:{}", name))?;
        Ok(self.state.lock().unwrap().rasters.remove(name).is_some())
    }

    async fn color_ramps(&self) -> StoreResult<ColorRampTable> {
        self.record("color_ramps".to_string())?;
        Ok(self.state.lock().unwrap().ramps.clone())
    }

    async fn apply_colors(&self, map: &str, ramp: &str, offset_scale: Option<(f64, f64)>) -> StoreResult<()> {
        self.record(format!("apply_colors:{}:{}", map, ramp))?;
        self.grid(map)?;
        self.state
            .lock()
            .unwrap()
            .colors
            .insert(map.to_string(), (ramp.to_string(), offset_scale));
        Ok(())
    }

    async fn export_cog(&self, map: &str, path: &Path) -> StoreResult<()> {
        self.record(format!("export_cog:{}", map))?;
        let cells = self.grid(map)?;
        std::fs::write(path, format!("COG {} ({} cells)\n", map, cells.len()))?;
        Ok(())
    }

    async fn style_document(&self, map: &str) -> StoreResult<String> {
        self.record(format!("style_document:{}", map))?;
        self.grid(map)?;
        Ok(self.state.lock().unwrap().style.clone())
    }

    async fn projection_epsg(&self) -> StoreResult<EpsgCode> {
        self.record("projection_epsg".to_string())?;
        Ok(self.state.lock().unwrap().epsg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_percentiles_skip_nodata() {
        let store = FakeRasterStore::new().with_raster(
            "m",
            vec![Some(1.0), None, Some(3.0), Some(2.0), Some(100.0)],
        );
        let p = store.percentiles("m", &[0.0, 100.0]).await.unwrap();
        assert_eq!(p, vec![1.0, 100.0]);
    }

    #[tokio::test]
    async fn test_fail_on_injection() {
        let store = FakeRasterStore::new()
            .with_raster("m", vec![Some(1.0)])
            .fail_on("export_cog");
        let err = store
            .export_cog("m", Path::new("/nonexistent/m.tif"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("injected failure"));
        assert_eq!(store.calls(), vec!["export_cog:m"]);
    }
}
