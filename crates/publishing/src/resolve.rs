//! Dataset kind resolution.

use tracing::debug;

use grass_store::parse::strip_mapset;
use grass_store::RasterStore;
use publish_common::{DatasetKind, DatasetType};

use crate::error::{PublishError, Result};

/// Decide whether `name` is a raster or an STRDS in the current mapset.
///
/// `Auto` checks both lists; a name found in both is ambiguous.
pub async fn resolve_dataset<S: RasterStore + ?Sized>(
    store: &S,
    name: &str,
    dataset_type: DatasetType,
) -> Result<DatasetKind> {
    let name = strip_mapset(name);

    let is_strds = dataset_type.includes(DatasetKind::Strds)
        && store.list_strds().await?.iter().any(|s| s == name);
    let is_raster = dataset_type.includes(DatasetKind::Raster)
        && store.list_rasters().await?.iter().any(|r| r == name);

    let kind = match (is_raster, is_strds) {
        (true, true) => return Err(PublishError::AmbiguousDataset(name.to_string())),
        (true, false) => DatasetKind::Raster,
        (false, true) => DatasetKind::Strds,
        (false, false) => return Err(PublishError::DatasetNotFound(name.to_string())),
    };

    debug!(dataset = %name, kind = %kind, "Resolved dataset");
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::FakeRasterStore;

    fn store() -> FakeRasterStore {
        FakeRasterStore::new()
            .with_raster("elevation", vec![Some(1.0)])
            .with_raster("lst", vec![Some(1.0)])
            .with_strds("lst", vec![("lst_2015_01", "2015-01-01", vec![Some(1.0)])])
    }

    #[tokio::test]
    async fn test_auto_resolution() {
        let store = store();
        assert_eq!(
            resolve_dataset(&store, "elevation@PERMANENT", DatasetType::Auto).await.unwrap(),
            DatasetKind::Raster
        );
        assert!(matches!(
            resolve_dataset(&store, "lst", DatasetType::Auto).await,
            Err(PublishError::AmbiguousDataset(_))
        ));
        assert!(matches!(
            resolve_dataset(&store, "missing", DatasetType::Auto).await,
            Err(PublishError::DatasetNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_explicit_type_checks_own_list_only() {
        let store = store();
        assert_eq!(
            resolve_dataset(&store, "lst", DatasetType::Strds).await.unwrap(),
            DatasetKind::Strds
        );
        assert!(!store.called("list_rasters"));

        assert!(matches!(
            resolve_dataset(&store, "elevation", DatasetType::Strds).await,
            Err(PublishError::DatasetNotFound(_))
        ));
    }
}
