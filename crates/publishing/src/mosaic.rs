//! Mosaic granule layout and the indexer descriptors.
//!
//! Granule file names embed the timestep date as `_time_YYYYMMDD`; the
//! timeregex descriptor extracts exactly that token. Changing either side
//! alone breaks GeoServer's time index.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};
use uuid::Uuid;

use grass_store::RasterStore;
use publish_common::{TemporalRasterSeries, Timestep, TIME_TOKEN_MARKER, TIME_TOKEN_REGEX};

use crate::error::{PublishError, Result};

pub const INDEXER_FILE: &str = "indexer.properties";
pub const TIMEREGEX_FILE: &str = "timeregex.properties";

/// Permissions of mosaic directories: GeoServer writes its index there.
#[cfg(unix)]
const MOSAIC_DIR_MODE: u32 = 0o707;

/// `<map>_<id>_time_<YYYYMMDD>.tif`
pub fn granule_file_name(step: &Timestep, id: &str) -> String {
    format!(
        "{}_{}{}{}.tif",
        step.map_name,
        id,
        TIME_TOKEN_MARKER,
        step.date_token()
    )
}

pub fn indexer_properties() -> String {
    format!(
        "TimeAttribute=date\n\
         PropertyCollectors=TimestampFileNameExtractorSPI[{}](date)\n\
         Schema=*the_geom:Polygon,location:String,date:java.util.Date\n",
        TIMEREGEX_FILE.trim_end_matches(".properties")
    )
}

pub fn timeregex_properties() -> String {
    format!("regex={}\n", TIME_TOKEN_REGEX)
}

/// Create the mosaic directory.
///
/// An existing directory with contents belongs to another mosaic and is a
/// conflict; it is never merged into.
pub async fn prepare_target_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        let mut entries = tokio::fs::read_dir(dir).await?;
        if entries.next_entry().await?.is_some() {
            return Err(PublishError::DirectoryConflict(dir.to_path_buf()));
        }
    }
    tokio::fs::create_dir_all(dir).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(dir, std::fs::Permissions::from_mode(MOSAIC_DIR_MODE)).await?;
    }

    Ok(())
}

/// Export every timestep as a granule into `dir`; returns the file names.
#[instrument(skip(store, series), fields(strds = %series.name, dir = %dir.display()))]
pub async fn export_granules<S: RasterStore + ?Sized>(
    store: &S,
    series: &TemporalRasterSeries,
    dir: &Path,
) -> Result<Vec<String>> {
    let mut names = Vec::with_capacity(series.len());

    for step in &series.timesteps {
        let name = granule_file_name(step, &Uuid::new_v4().simple().to_string());
        store.set_region_to_raster(&step.map_name).await?;
        store.export_cog(&step.map_name, &dir.join(&name)).await?;
        debug!(map = %step.map_name, granule = %name, "Exported granule");
        names.push(name);
    }

    info!(count = names.len(), "Exported mosaic granules");
    Ok(names)
}

/// Write the indexer descriptors into `dir` unless already present.
pub async fn write_aux_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    for (file, content) in [
        (INDEXER_FILE, indexer_properties()),
        (TIMEREGEX_FILE, timeregex_properties()),
    ] {
        let path = dir.join(file);
        if tokio::fs::try_exists(&path).await? {
            debug!(path = %path.display(), "Descriptor already present");
            continue;
        }
        tokio::fs::write(&path, content).await?;
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use publish_common::{extract_date_token, parse_date_token, parse_start_time};
    use test_utils::FakeRasterStore;

    #[test]
    fn test_granule_name_token_round_trips() {
        let step = Timestep::new("lst_2015_03", parse_start_time("2015-03-01 00:00:00").unwrap());
        let name = granule_file_name(&step, "0f3c");

        assert_eq!(name, "lst_2015_03_0f3c_time_20150301.tif");
        let token = extract_date_token(&name).unwrap();
        assert_eq!(parse_date_token(token).unwrap(), step.start_time.date());
    }

    #[test]
    fn test_descriptor_contents() {
        assert_eq!(
            indexer_properties(),
            "TimeAttribute=date\n\
             PropertyCollectors=TimestampFileNameExtractorSPI[timeregex](date)\n\
             Schema=*the_geom:Polygon,location:String,date:java.util.Date\n"
        );
        assert_eq!(timeregex_properties(), "regex=(?<=_time_)[0-9]{8}\n");
    }

    #[tokio::test]
    async fn test_non_empty_dir_is_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("lst");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("old_time_20100101.tif"), b"x").unwrap();

        let err = prepare_target_dir(&target).await.unwrap_err();
        assert!(matches!(err, PublishError::DirectoryConflict(p) if p == target));
    }

    #[tokio::test]
    async fn test_empty_dir_accepted_with_mode() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a").join("lst");
        prepare_target_dir(&target).await.unwrap();
        assert!(target.is_dir());

        std::fs::create_dir_all(dir.path().join("empty")).unwrap();
        prepare_target_dir(&dir.path().join("empty")).await.unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&target).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o707);
        }
    }

    #[tokio::test]
    async fn test_aux_files_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(INDEXER_FILE), "custom").unwrap();

        let written = write_aux_files(dir.path()).await.unwrap();

        assert_eq!(written, vec![dir.path().join(TIMEREGEX_FILE)]);
        assert_eq!(std::fs::read_to_string(dir.path().join(INDEXER_FILE)).unwrap(), "custom");
    }

    #[tokio::test]
    async fn test_export_granules_unique_names() {
        let start = parse_start_time("2015-01-01").unwrap();
        let store = FakeRasterStore::new().with_raster("m", vec![Some(1.0)]);
        let series = TemporalRasterSeries::new(
            "s",
            vec![Timestep::new("m", start), Timestep::new("m", start)],
        );
        let dir = tempfile::tempdir().unwrap();

        let names = export_granules(&store, &series, dir.path()).await.unwrap();

        assert_eq!(names.len(), 2);
        assert_ne!(names[0], names[1]);
        assert!(names.iter().all(|n| dir.path().join(n).is_file()));
        assert!(names.iter().all(|n| extract_date_token(n) == Some("20150101")));
    }
}
