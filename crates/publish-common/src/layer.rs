//! Publish targets and dataset identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a run publishes: one layer per timestep, or one time-enabled mosaic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublishTarget {
    /// One layer per timestep, named `<prefix>_1 ... <prefix>_N`
    DiscreteLayers { prefix: String },
    /// One layer indexing every timestep by its date
    MosaicLayer { name: String },
}

impl PublishTarget {
    /// Build the target from the two mutually exclusive naming options.
    pub fn from_options(
        layername_prefix: Option<String>,
        mosaic_layername: Option<String>,
    ) -> Result<Self, TargetError> {
        let prefix = layername_prefix.filter(|s| !s.is_empty());
        let mosaic = mosaic_layername.filter(|s| !s.is_empty());

        match (prefix, mosaic) {
            (Some(prefix), None) => Ok(PublishTarget::DiscreteLayers { prefix }),
            (None, Some(name)) => Ok(PublishTarget::MosaicLayer { name }),
            (Some(_), Some(_)) => Err(TargetError::BothGiven),
            (None, None) => Err(TargetError::NoneGiven),
        }
    }

    pub fn is_mosaic(&self) -> bool {
        matches!(self, PublishTarget::MosaicLayer { .. })
    }
}

/// Layer names for discrete publishing: `<prefix>_1` through `<prefix>_<count>`.
pub fn discrete_layer_names(prefix: &str, count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("{}_{}", prefix, i)).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("Options layername_prefix and mosaic_layername are mutually exclusive")]
    BothGiven,

    #[error("One of layername_prefix or mosaic_layername is required")]
    NoneGiven,
}

/// Kind of dataset a name refers to in the raster store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetKind {
    Raster,
    Strds,
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKind::Raster => write!(f, "raster"),
            DatasetKind::Strds => write!(f, "strds"),
        }
    }
}

/// Requested dataset kind; `Auto` checks both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetType {
    #[default]
    Auto,
    Raster,
    Strds,
}

impl DatasetType {
    pub fn includes(&self, kind: DatasetKind) -> bool {
        match self {
            DatasetType::Auto => true,
            DatasetType::Raster => kind == DatasetKind::Raster,
            DatasetType::Strds => kind == DatasetKind::Strds,
        }
    }
}

impl FromStr for DatasetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(DatasetType::Auto),
            "raster" => Ok(DatasetType::Raster),
            "strds" => Ok(DatasetType::Strds),
            other => Err(format!("Unknown dataset type: {}", other)),
        }
    }
}
