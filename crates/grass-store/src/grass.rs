//! [`RasterStore`] backed by GRASS GIS command-line modules.
//!
//! Must run inside a GRASS session (GISRC set), as the modules resolve
//! the current location and mapset from it.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use publish_common::{ColorRampTable, EpsgCode, RescaleTransform, Timestep, RESCALED_MAX, RESCALED_MIN};

use crate::error::{StoreError, StoreResult};
use crate::parse::{
    parse_dataset_names, parse_key_values, parse_quantiles, parse_timesteps, LIST_SEPARATOR,
};
use crate::RasterStore;

/// Creation options for exported granules.
const COG_CREATE_OPTIONS: &str = "COMPRESS=LZW,TILED=YES";

/// Overview levels built into exported granules.
const COG_OVERVIEWS: u32 = 5;

/// Raster store that shells out to GRASS modules.
#[derive(Debug, Clone, Default)]
pub struct GrassCli {
    /// Pass `--quiet` to modules that write progress to stderr
    quiet: bool,
}

impl GrassCli {
    pub fn new() -> Self {
        Self { quiet: true }
    }

    pub fn verbose(mut self) -> Self {
        self.quiet = false;
        self
    }

    /// Run a module and return its stdout.
    async fn run<S: AsRef<str>>(&self, module: &str, args: &[S]) -> StoreResult<String> {
        let mut cmd = Command::new(module);
        cmd.args(args.iter().map(|a| a.as_ref()))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if self.quiet {
            cmd.arg("--quiet");
        }

        debug!(
            module = %module,
            args = ?args.iter().map(|a| a.as_ref()).collect::<Vec<_>>(),
            "Running GRASS module"
        );

        let output = cmd.output().await?;
        if !output.status.success() {
            return Err(StoreError::CommandFailed {
                module: module.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn gisenv(&self, variable: &str) -> StoreResult<String> {
        let out = self.run("g.gisenv", &[format!("get={}", variable)]).await?;
        let value = out.trim().to_string();
        if value.is_empty() {
            return Err(StoreError::parse("g.gisenv", format!("{} is not set", variable)));
        }
        Ok(value)
    }

    async fn region_exists(&self, name: &str) -> StoreResult<bool> {
        let out = self
            .run("g.list", &["type=region".to_string(), format!("pattern={}", name)])
            .await?;
        Ok(parse_dataset_names(&out).iter().any(|n| n == name))
    }

    async fn raster_exists(&self, name: &str) -> StoreResult<bool> {
        let out = self
            .run("g.list", &["type=raster".to_string(), format!("pattern={}", name)])
            .await?;
        Ok(parse_dataset_names(&out).iter().any(|n| n == name))
    }
}

/// `r.mapcalc` expression that writes `output` as `input` rescaled onto `[1, 255]`.
pub fn mapcalc_rescale_expression(input: &str, output: &str, transform: &RescaleTransform) -> String {
    let min = transform.global_min();
    let max = transform.global_max();
    format!(
        "{out} = float(if({inp} <= ({min}), {lo}, if({inp} > ({max}), {hi}, \
         {lo} + {span} * ({inp} - ({min})) / (({max}) - ({min})))))",
        out = output,
        inp = input,
        min = min,
        max = max,
        lo = format_float(RESCALED_MIN),
        hi = format_float(RESCALED_MAX),
        span = format_float(RESCALED_MAX - RESCALED_MIN),
    )
}

/// Format with a decimal point so r.mapcalc never falls back to integer math.
fn format_float(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{:.1}", v)
    } else {
        v.to_string()
    }
}

#[async_trait]
impl RasterStore for GrassCli {
    async fn list_strds(&self) -> StoreResult<Vec<String>> {
        let out = self.run("t.list", &["type=strds"]).await?;
        Ok(parse_dataset_names(&out))
    }

    async fn list_rasters(&self) -> StoreResult<Vec<String>> {
        let out = self.run("g.list", &["type=raster", "mapset=."]).await?;
        Ok(parse_dataset_names(&out))
    }

    async fn current_mapset(&self) -> StoreResult<String> {
        self.gisenv("MAPSET").await
    }

    async fn current_location(&self) -> StoreResult<String> {
        self.gisenv("LOCATION_NAME").await
    }

    #[instrument(skip(self))]
    async fn list_timesteps(&self, strds: &str) -> StoreResult<Vec<Timestep>> {
        let out = self
            .run(
                "t.rast.list",
                &[
                    "-u".to_string(),
                    format!("input={}", strds),
                    "columns=name,start_time".to_string(),
                    format!("separator={}", LIST_SEPARATOR),
                    "order=start_time".to_string(),
                ],
            )
            .await?;
        parse_timesteps(&out)
    }

    async fn list_map_names(&self, strds: &str) -> StoreResult<Vec<String>> {
        let out = self
            .run(
                "t.rast.list",
                &[
                    "-u".to_string(),
                    format!("input={}", strds),
                    "columns=name".to_string(),
                    "order=start_time".to_string(),
                ],
            )
            .await?;
        Ok(parse_dataset_names(&out))
    }

    #[instrument(skip(self))]
    async fn percentiles(&self, map: &str, percentiles: &[f64]) -> StoreResult<Vec<f64>> {
        let list = percentiles
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let out = self
            .run(
                "r.quantile",
                &[format!("input={}", map), format!("percentiles={}", list)],
            )
            .await?;
        parse_quantiles(&out, percentiles.len())
    }

    #[instrument(skip(self, transform))]
    async fn rescale(&self, input: &str, output: &str, transform: &RescaleTransform) -> StoreResult<()> {
        let expression = mapcalc_rescale_expression(input, output, transform);
        self.run(
            "r.mapcalc",
            &[format!("expression={}", expression), "--overwrite".to_string()],
        )
        .await?;
        Ok(())
    }

    async fn set_region_to_raster(&self, map: &str) -> StoreResult<()> {
        self.run("g.region", &[format!("raster={}", map)]).await?;
        Ok(())
    }

    async fn save_region(&self, name: &str) -> StoreResult<()> {
        self.run("g.region", &[format!("save={}", name), "--overwrite".to_string()])
            .await?;
        Ok(())
    }

    async fn restore_region(&self, name: &str) -> StoreResult<bool> {
        if !self.region_exists(name).await? {
            return Ok(false);
        }
        self.run("g.region", &[format!("region={}", name)]).await?;
        Ok(true)
    }

    async fn remove_region(&self, name: &str) -> StoreResult<()> {
        self.run(
            "g.remove",
            &["-f".to_string(), "type=region".to_string(), format!("name={}", name)],
        )
        .await?;
        Ok(())
    }

    async fn remove_raster(&self, name: &str) -> StoreResult<bool> {
        if !self.raster_exists(name).await? {
            return Ok(false);
        }
        self.run(
            "g.remove",
            &["-f".to_string(), "type=raster".to_string(), format!("name={}", name)],
        )
        .await?;
        Ok(true)
    }

    async fn color_ramps(&self) -> StoreResult<ColorRampTable> {
        let out = self.run("r.colors", &["-d"]).await?;
        ColorRampTable::parse_listing(&out).map_err(|e| StoreError::parse("r.colors", e.to_string()))
    }

    #[instrument(skip(self))]
    async fn apply_colors(&self, map: &str, ramp: &str, offset_scale: Option<(f64, f64)>) -> StoreResult<()> {
        let mut args = vec![format!("map={}", map), format!("color={}", ramp)];
        if let Some((offset, scale)) = offset_scale {
            args.push(format!("offset={}", offset));
            args.push(format!("scale={}", scale));
        }
        self.run("r.colors", &args).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn export_cog(&self, map: &str, path: &Path) -> StoreResult<()> {
        self.run(
            "r.out.gdal",
            &[
                "-m".to_string(),
                "-c".to_string(),
                format!("input={}", map),
                format!("output={}", path.display()),
                "format=COG".to_string(),
                format!("createopt={}", COG_CREATE_OPTIONS),
                format!("overviews={}", COG_OVERVIEWS),
            ],
        )
        .await?;
        Ok(())
    }

    async fn style_document(&self, map: &str) -> StoreResult<String> {
        self.run("r.colors.out_sld", &[format!("map={}", map)]).await
    }

    async fn projection_epsg(&self) -> StoreResult<EpsgCode> {
        let out = self.run("g.proj", &["-g"]).await?;
        let info = parse_key_values(&out);
        EpsgCode::from_projection_info(&info).map_err(|e| StoreError::parse("g.proj", e.to_string()))
    }
}
