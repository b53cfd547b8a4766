//! JSON bodies of the GeoServer REST resources.
//!
//! GeoServer's JSON flavour keeps XML attributes as `@name` keys and text
//! content as `$`.

use serde::{Deserialize, Serialize};

use publish_common::EpsgCode;

/// Reference to another resource by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub name: String,
}

impl NamedRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceBody {
    pub workspace: NamedRef,
}

/// Coverage store implementation used by GeoServer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StoreType {
    ImageMosaic,
    GeoTIFF,
    #[serde(rename = "GRASS")]
    Grass,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverageStore {
    pub name: String,
    #[serde(rename = "type")]
    pub store_type: StoreType,
    pub enabled: bool,
    pub workspace: NamedRef,
    pub url: String,
}

impl CoverageStore {
    /// A store reading data the server can see at `server_path`.
    pub fn new(name: &str, store_type: StoreType, workspace: &str, server_path: &str) -> Self {
        Self {
            name: name.to_string(),
            store_type,
            enabled: true,
            workspace: NamedRef::new(workspace),
            url: format!("file:{}", server_path),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverageStoreBody {
    #[serde(rename = "coverageStore")]
    pub coverage_store: CoverageStore,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StringList {
    pub string: Vec<String>,
}

impl StringList {
    pub fn of<I: IntoIterator<Item = S>, S: Into<String>>(items: I) -> Self {
        Self {
            string: items.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreRef {
    #[serde(rename = "@class")]
    pub class: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultValue {
    pub strategy: String,
    pub reference_value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionInfo {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<DefaultValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearest_match_enabled: Option<bool>,
}

impl DimensionInfo {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            presentation: None,
            units: None,
            default_value: None,
            nearest_match_enabled: None,
        }
    }

    /// Time dimension listing every instant, defaulting to the current time,
    /// without nearest-match lookup.
    pub fn time_list() -> Self {
        Self {
            enabled: true,
            presentation: Some("LIST".to_string()),
            units: Some("ISO8601".to_string()),
            default_value: Some(DefaultValue {
                strategy: "NEAREST".to_string(),
                reference_value: "CURRENT".to_string(),
            }),
            nearest_match_enabled: Some(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataEntry {
    #[serde(rename = "@key")]
    pub key: String,
    #[serde(rename = "dimensionInfo", skip_serializing_if = "Option::is_none")]
    pub dimension_info: Option<DimensionInfo>,
    #[serde(rename = "$", skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl MetadataEntry {
    pub fn dimension(key: &str, info: DimensionInfo) -> Self {
        Self {
            key: key.to_string(),
            dimension_info: Some(info),
            value: None,
        }
    }

    pub fn text(key: &str, value: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            dimension_info: None,
            value: Some(value.into()),
        }
    }
}

/// Coverage metadata; serializes to `{}` when empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<MetadataEntry>,
}

impl Metadata {
    /// Elevation disabled, time enabled as a list.
    pub fn time_enabled() -> Self {
        Self {
            entry: vec![
                MetadataEntry::dimension("elevation", DimensionInfo::disabled()),
                MetadataEntry::dimension("time", DimensionInfo::time_list()),
            ],
        }
    }

    pub fn has_time(&self) -> bool {
        self.entry
            .iter()
            .any(|e| e.key == "time" && e.dimension_info.as_ref().is_some_and(|d| d.enabled))
    }
}

/// A coverage (the resource behind a published raster layer).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coverage {
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_interpolation_method: Option<String>,
    pub description: String,
    pub enabled: bool,
    pub keywords: StringList,
    pub name: String,
    pub namespace: NamedRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_coverage_name: Option<String>,
    #[serde(rename = "requestSRS", skip_serializing_if = "Option::is_none")]
    pub request_srs: Option<StringList>,
    #[serde(rename = "responseSRS", skip_serializing_if = "Option::is_none")]
    pub response_srs: Option<StringList>,
    pub srs: String,
    pub store: StoreRef,
    pub title: String,
    pub metadata: Metadata,
}

impl Coverage {
    fn base(layer: &str, title: &str, workspace: &str, store: &str, epsg: EpsgCode, keyword: &str) -> Self {
        Self {
            abstract_text: None,
            default_interpolation_method: None,
            description: String::new(),
            enabled: true,
            keywords: StringList::of([keyword, title]),
            name: layer.to_string(),
            namespace: NamedRef::new(workspace),
            native_format: None,
            native_name: None,
            native_coverage_name: None,
            request_srs: None,
            response_srs: None,
            srs: epsg.to_string(),
            store: StoreRef {
                class: "coverageStore".to_string(),
                name: format!("{}:{}", workspace, store),
            },
            title: title.to_string(),
            metadata: Metadata::default(),
        }
    }

    /// GeoTIFF-backed coverage served from exported granules.
    ///
    /// `time_enabled` adds the time dimension (mosaic layers); a bare
    /// discrete layer carries no metadata.
    pub fn granule_layer(layer: &str, workspace: &str, store: &str, epsg: EpsgCode, time_enabled: bool) -> Self {
        let srs_list = StringList::of([epsg.to_string()]);
        Self {
            abstract_text: Some(String::new()),
            default_interpolation_method: Some("nearest neighbor".to_string()),
            description: "Generated by geoserver-publish".to_string(),
            native_format: Some("GeoTIFF".to_string()),
            native_name: Some(layer.to_string()),
            request_srs: Some(srs_list.clone()),
            response_srs: Some(srs_list),
            metadata: if time_enabled {
                Metadata::time_enabled()
            } else {
                Metadata::default()
            },
            ..Self::base(layer, layer, workspace, store, epsg, "WMS")
        }
    }

    /// Coverage read in place from a GRASS mapset.
    ///
    /// Temporal datasets get the time dimension plus the granule directory
    /// name GeoServer uses for its index.
    pub fn grass_layer(
        layer: &str,
        title: &str,
        workspace: &str,
        store: &str,
        native_coverage_name: &str,
        epsg: EpsgCode,
        temporal: bool,
    ) -> Self {
        let metadata = if temporal {
            let mut metadata = Metadata::time_enabled();
            metadata
                .entry
                .push(MetadataEntry::text("dirName", format!("{}_{}", store, layer)));
            metadata
        } else {
            Metadata::default()
        };

        Self {
            description: "Generated from GRASS GIS".to_string(),
            native_coverage_name: Some(native_coverage_name.to_string()),
            metadata,
            ..Self::base(layer, title, workspace, store, epsg, "WCS")
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverageBody {
    pub coverage: Coverage,
}

#[derive(Debug, Clone, Serialize)]
pub struct Style {
    pub name: String,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StyleBody {
    pub style: Style,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mosaic_coverage_json() {
        let cov = Coverage::granule_layer("lst", "ws", "lst_coverage_42", EpsgCode(3358), true);
        let value = serde_json::to_value(CoverageBody { coverage: cov }).unwrap();
        let c = &value["coverage"];

        assert_eq!(c["name"], "lst");
        assert_eq!(c["nativeName"], "lst");
        assert_eq!(c["srs"], "EPSG:3358");
        assert_eq!(c["requestSRS"], json!({"string": ["EPSG:3358"]}));
        assert_eq!(c["store"]["@class"], "coverageStore");
        assert_eq!(c["store"]["name"], "ws:lst_coverage_42");
        assert_eq!(c["abstract"], "");
        assert_eq!(c["keywords"], json!({"string": ["WMS", "lst"]}));

        let time = &c["metadata"]["entry"][1];
        assert_eq!(time["@key"], "time");
        assert_eq!(
            time["dimensionInfo"],
            json!({
                "enabled": true,
                "presentation": "LIST",
                "units": "ISO8601",
                "defaultValue": {"strategy": "NEAREST", "referenceValue": "CURRENT"},
                "nearestMatchEnabled": false
            })
        );
        assert_eq!(
            c["metadata"]["entry"][0],
            json!({"@key": "elevation", "dimensionInfo": {"enabled": false}})
        );
    }

    #[test]
    fn test_discrete_coverage_has_empty_metadata() {
        let cov = Coverage::granule_layer("test_1", "ws", "test_1_store", EpsgCode(4326), false);
        assert!(!cov.metadata.has_time());
        let value = serde_json::to_value(&cov).unwrap();
        assert_eq!(value["metadata"], json!({}));
        assert_eq!(value["nativeName"], "test_1");
    }

    #[test]
    fn test_grass_coverage_json() {
        let cov = Coverage::grass_layer(
            "lst_layer",
            "LST",
            "ws",
            "cs",
            "LST_Day_monthly@modis_lst",
            EpsgCode(3358),
            true,
        );
        let value = serde_json::to_value(&cov).unwrap();
        assert_eq!(value["nativeCoverageName"], "LST_Day_monthly@modis_lst");
        assert_eq!(value["keywords"], json!({"string": ["WCS", "LST"]}));
        assert_eq!(value["title"], "LST");
        assert!(value.get("nativeName").is_none());
        assert_eq!(
            value["metadata"]["entry"][2],
            json!({"@key": "dirName", "$": "cs_lst_layer"})
        );
    }

    #[test]
    fn test_store_json() {
        let store = CoverageStore::new("cs", StoreType::Grass, "ws", "/grassdb/loc/mapset/cellhd/elev");
        let value = serde_json::to_value(CoverageStoreBody {
            coverage_store: store,
        })
        .unwrap();
        assert_eq!(
            value,
            json!({"coverageStore": {
                "name": "cs",
                "type": "GRASS",
                "enabled": true,
                "workspace": {"name": "ws"},
                "url": "file:/grassdb/loc/mapset/cellhd/elev"
            }})
        );
    }
}
