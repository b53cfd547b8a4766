//! Percentile rescaler.
//!
//! One transform is derived for the whole series from per-map percentile
//! bounds and applied to every map, so colors mean the same across time.

use tracing::{debug, info, instrument};

use grass_store::RasterStore;
use publish_common::{RescaleTransform, TemporalRasterSeries, Timestep};

use crate::error::{PublishError, Result};
use crate::scope::RunScope;

/// Lower percentile taken from every map.
pub const LOWER_PERCENTILE: f64 = 2.0;

/// Upper percentile taken from every map.
pub const UPPER_PERCENTILE: f64 = 98.0;

/// Series-wide transform: min of the per-map lower percentiles to max of the
/// per-map upper percentiles.
#[instrument(skip(store, series), fields(strds = %series.name, maps = series.len()))]
pub async fn compute_transform<S: RasterStore + ?Sized>(
    store: &S,
    series: &TemporalRasterSeries,
) -> Result<RescaleTransform> {
    if series.is_empty() {
        return Err(PublishError::EmptySeries(series.name.clone()));
    }

    let mut global_min = f64::INFINITY;
    let mut global_max = f64::NEG_INFINITY;

    for map in series.map_names() {
        store.set_region_to_raster(map).await?;
        let bounds = store
            .percentiles(map, &[LOWER_PERCENTILE, UPPER_PERCENTILE])
            .await?;
        let (lower, upper) = match bounds.as_slice() {
            [lower, upper] => (*lower, *upper),
            _ => {
                return Err(PublishError::Store(grass_store::StoreError::parse(
                    "r.quantile",
                    format!("expected 2 percentiles for {}, got {}", map, bounds.len()),
                )))
            }
        };
        debug!(map = %map, p2 = lower, p98 = upper, "Percentile bounds");

        global_min = global_min.min(lower);
        global_max = global_max.max(upper);
    }

    let transform = RescaleTransform::new(global_min, global_max)?;
    info!(min = global_min, max = global_max, "Computed rescale range");
    Ok(transform)
}

/// Rescale every map into a temporary copy tracked by `scope`.
///
/// Returns the series of rescaled maps with the original start times.
#[instrument(skip_all, fields(strds = %series.name))]
pub async fn rescale_series<S: RasterStore + ?Sized>(
    store: &S,
    series: &TemporalRasterSeries,
    transform: &RescaleTransform,
    scope: &mut RunScope,
) -> Result<TemporalRasterSeries> {
    let mut rescaled = Vec::with_capacity(series.len());

    for step in &series.timesteps {
        let output = scope.rescaled_name(&step.map_name);
        scope.track_raster(output.clone());
        store.set_region_to_raster(&step.map_name).await?;
        store.rescale(&step.map_name, &output, transform).await?;
        debug!(input = %step.map_name, output = %output, "Rescaled map");
        rescaled.push(Timestep::new(output, step.start_time));
    }

    Ok(TemporalRasterSeries::new(series.name.clone(), rescaled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use publish_common::parse_start_time;
    use test_utils::{assert_approx_eq, FakeRasterStore};

    fn series_of(maps: &[(&str, &str)]) -> TemporalRasterSeries {
        TemporalRasterSeries::new(
            "s",
            maps.iter()
                .map(|(m, t)| Timestep::new(*m, parse_start_time(t).unwrap()))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_global_range_spans_all_maps() {
        let low: Vec<Option<f64>> = (0..=100).map(|i| Some(i as f64)).collect();
        let high: Vec<Option<f64>> = (0..=100).map(|i| Some(50.0 + i as f64)).collect();
        let store = FakeRasterStore::new()
            .with_raster("a", low)
            .with_raster("b", high);
        let series = series_of(&[("a", "2020-01-01"), ("b", "2020-02-01")]);

        let transform = compute_transform(&store, &series).await.unwrap();

        assert_approx_eq!(transform.global_min(), 2.0, 1e-9);
        assert_approx_eq!(transform.global_max(), 148.0, 1e-9);
    }

    #[tokio::test]
    async fn test_flat_series_is_degenerate() {
        let store = FakeRasterStore::new()
            .with_raster("a", vec![Some(7.0); 10])
            .with_raster("b", vec![Some(7.0), None, Some(7.0)]);
        let series = series_of(&[("a", "2020-01-01"), ("b", "2020-02-01")]);

        let err = compute_transform(&store, &series).await.unwrap_err();
        assert!(matches!(err, PublishError::DegenerateRange(_)));
    }

    #[tokio::test]
    async fn test_rescaled_maps_tracked_and_bounded() {
        let cells: Vec<Option<f64>> = (0..=100).map(|i| Some(i as f64 * 3.0)).collect();
        let store = FakeRasterStore::new().with_raster("a", cells);
        let series = series_of(&[("a", "2020-01-01")]);
        let mut scope = RunScope::with_run_id(9);

        let transform = compute_transform(&store, &series).await.unwrap();
        let rescaled = rescale_series(&store, &series, &transform, &mut scope)
            .await
            .unwrap();

        assert_eq!(rescaled.timesteps[0].map_name, "a_255_9");
        assert_eq!(rescaled.timesteps[0].start_time, series.timesteps[0].start_time);
        assert_eq!(scope.tracked_rasters(), ["a_255_9".to_string()]);

        let values: Vec<f64> = store.raster("a_255_9").unwrap().into_iter().flatten().collect();
        assert!(values.iter().all(|v| (1.0..=255.0).contains(v)));
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(values[0], 1.0);
        assert_eq!(values[100], 255.0);

        // Cell 150 sits inside the range and is interpolated linearly.
        let (min, max) = (transform.global_min(), transform.global_max());
        assert_approx_eq!(values[50], 1.0 + 254.0 * (150.0 - min) / (max - min), 1e-9);
    }
}
