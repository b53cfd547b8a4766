//! Known color ramps and their declared data ranges.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ramp name that stands for "no color table requested".
pub const DEFAULT_RAMP: &str = "default";

/// Upper bound of the display range a ramp is stretched onto.
const DISPLAY_RANGE: f64 = 255.0;

/// Declared data range of a color ramp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ColorRampRange {
    /// Ramp is defined over fixed data values
    Fixed { min: f64, max: f64 },
    /// Ramp stretches over the map's own value range
    MapValues,
}

impl ColorRampRange {
    /// Offset and scale that map the ramp's declared range onto `[0, 255]`.
    ///
    /// `None` for ramps that already follow the map's values.
    pub fn offset_scale(&self) -> Option<(f64, f64)> {
        match *self {
            ColorRampRange::Fixed { min, max } if max > min => {
                Some((-min, DISPLAY_RANGE / (max - min)))
            }
            _ => None,
        }
    }
}

/// Table of color ramps known to the raster store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorRampTable {
    ramps: BTreeMap<String, ColorRampRange>,
}

impl ColorRampTable {
    /// Parse the ramp listing printed by the raster store.
    ///
    /// Each line reads `name: description [range: A to B]` or
    /// `name: description [range: map values]`. Lines without a range are ignored.
    pub fn parse_listing(text: &str) -> Result<Self, ColorRampError> {
        let mut ramps = BTreeMap::new();

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let Some((name, rest)) = line.split_once(':') else {
                continue;
            };
            let Some((_, range)) = rest.split_once("range: ") else {
                continue;
            };
            let range = range.trim().trim_end_matches(']').trim();

            let parsed = if range == "map values" {
                ColorRampRange::MapValues
            } else {
                let (min, max) = range
                    .split_once(" to ")
                    .ok_or_else(|| ColorRampError::InvalidRange(line.to_string()))?;
                let min = min
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| ColorRampError::InvalidRange(line.to_string()))?;
                let max = max
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| ColorRampError::InvalidRange(line.to_string()))?;
                ColorRampRange::Fixed { min, max }
            };

            ramps.insert(name.trim().to_string(), parsed);
        }

        Ok(Self { ramps })
    }

    pub fn insert(&mut self, name: impl Into<String>, range: ColorRampRange) {
        self.ramps.insert(name.into(), range);
    }

    pub fn get(&self, name: &str) -> Option<ColorRampRange> {
        self.ramps.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ramps.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ramps.keys().map(String::as_str)
    }

    /// Look up a requested ramp.
    ///
    /// `None` and `"default"` mean no styling; an unknown name is an error.
    pub fn resolve(&self, requested: Option<&str>) -> Result<Option<(String, ColorRampRange)>, ColorRampError> {
        match requested {
            None | Some(DEFAULT_RAMP) => Ok(None),
            Some(name) => self
                .get(name)
                .map(|range| Some((name.to_string(), range)))
                .ok_or_else(|| ColorRampError::UnknownRamp(name.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ColorRampError {
    #[error("Color range {0} not known")]
    UnknownRamp(String),

    #[error("Invalid color ramp range in line: {0}")]
    InvalidRange(String),
}
