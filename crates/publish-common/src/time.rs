//! Time handling for temporal raster series.
//!
//! Mosaic granules carry their timestep as an 8-digit date token in the
//! file name (`<name>_<id>_time_YYYYMMDD.tif`). The tile server extracts it
//! with [`TIME_TOKEN_REGEX`], so [`DATE_TOKEN_FORMAT`], [`TIME_TOKEN_MARKER`]
//! and the regex must always change together.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// strftime format of the date token embedded in granule file names.
pub const DATE_TOKEN_FORMAT: &str = "%Y%m%d";

/// Marker that precedes the date token in granule file names.
pub const TIME_TOKEN_MARKER: &str = "_time_";

/// Extraction pattern handed to the mosaic indexer.
pub const TIME_TOKEN_REGEX: &str = "(?<=_time_)[0-9]{8}";

const DATE_TOKEN_LEN: usize = 8;

/// One registered map of a temporal dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestep {
    /// Raster map name (without mapset)
    pub map_name: String,
    /// Start of the map's valid time
    pub start_time: NaiveDateTime,
}

impl Timestep {
    pub fn new(map_name: impl Into<String>, start_time: NaiveDateTime) -> Self {
        Self {
            map_name: map_name.into(),
            start_time,
        }
    }

    /// Date token used in granule file names.
    pub fn date_token(&self) -> String {
        self.start_time.format(DATE_TOKEN_FORMAT).to_string()
    }
}

/// A named temporal raster dataset and its maps, in time order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalRasterSeries {
    pub name: String,
    pub timesteps: Vec<Timestep>,
}

impl TemporalRasterSeries {
    pub fn new(name: impl Into<String>, timesteps: Vec<Timestep>) -> Self {
        Self {
            name: name.into(),
            timesteps,
        }
    }

    pub fn len(&self) -> usize {
        self.timesteps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timesteps.is_empty()
    }

    pub fn map_names(&self) -> impl Iterator<Item = &str> {
        self.timesteps.iter().map(|t| t.map_name.as_str())
    }
}

/// Parse an absolute start time as printed by the temporal framework.
///
/// Accepts `YYYY-MM-DD HH:MM:SS` (optionally with fractional seconds),
/// the ISO `T` separator, and bare dates.
pub fn parse_start_time(s: &str) -> Result<NaiveDateTime, TimeParseError> {
    let s = s.trim();

    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt);
        }
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

/// Find the date token in a granule file name.
///
/// Returns the leftmost 8-digit run directly preceded by `_time_`, which is
/// what [`TIME_TOKEN_REGEX`] matches.
pub fn extract_date_token(filename: &str) -> Option<&str> {
    filename.match_indices(TIME_TOKEN_MARKER).find_map(|(idx, marker)| {
        let start = idx + marker.len();
        let candidate = filename.get(start..start + DATE_TOKEN_LEN)?;
        candidate
            .bytes()
            .all(|b| b.is_ascii_digit())
            .then_some(candidate)
    })
}

/// Parse a date token back into a calendar date.
pub fn parse_date_token(token: &str) -> Result<NaiveDate, TimeParseError> {
    if token.len() != DATE_TOKEN_LEN {
        return Err(TimeParseError::InvalidToken(token.to_string()));
    }
    NaiveDate::parse_from_str(token, DATE_TOKEN_FORMAT)
        .map_err(|_| TimeParseError::InvalidToken(token.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),

    #[error("Invalid date token: {0}")]
    InvalidToken(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_start_time_variants() {
        let dt = parse_start_time("2016-01-01 00:00:00").unwrap();
        assert_eq!(dt.year(), 2016);
        assert_eq!(dt.day(), 1);

        let dt = parse_start_time("2016-03-05T12:30:00").unwrap();
        assert_eq!(dt.hour(), 12);
        assert_eq!(dt.minute(), 30);

        let dt = parse_start_time("2016-03-05").unwrap();
        assert_eq!(dt.month(), 3);
        assert_eq!(dt.hour(), 0);

        assert!(parse_start_time("3 days").is_err());
    }

    #[test]
    fn test_date_token_round_trip() {
        let ts = Timestep::new("lst_day", parse_start_time("2015-07-09 00:00:00").unwrap());
        let token = ts.date_token();
        assert_eq!(token, "20150709");

        let filename = format!("lst_day_0a1b2c3d_time_{}.tif", token);
        let extracted = extract_date_token(&filename).unwrap();
        assert_eq!(extracted, "20150709");
        assert_eq!(parse_date_token(extracted).unwrap(), ts.start_time.date());
    }

    #[test]
    fn test_extract_date_token_skips_non_digit_marker() {
        assert_eq!(
            extract_date_token("a_time_xx_b_time_20200101.tif"),
            Some("20200101")
        );
        assert_eq!(extract_date_token("a_time_2020.tif"), None);
        assert_eq!(extract_date_token("no_token_here.tif"), None);
    }

    #[test]
    fn test_parse_date_token_rejects_garbage() {
        assert!(parse_date_token("2020010").is_err());
        assert!(parse_date_token("20201345").is_err());
    }
}
