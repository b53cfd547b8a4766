//! Common types shared across the geoserver-publish crates.

pub mod color;
pub mod crs;
pub mod layer;
pub mod rescale;
pub mod time;

pub use color::{ColorRampError, ColorRampRange, ColorRampTable};
pub use crs::{CrsParseError, EpsgCode};
pub use layer::{discrete_layer_names, DatasetKind, DatasetType, PublishTarget, TargetError};
pub use rescale::{DegenerateRange, RescaleTransform, NODATA_VALUE, RESCALED_MAX, RESCALED_MIN};
pub use time::{
    extract_date_token, parse_date_token, parse_start_time, TemporalRasterSeries, TimeParseError,
    Timestep, DATE_TOKEN_FORMAT, TIME_TOKEN_MARKER, TIME_TOKEN_REGEX,
};
