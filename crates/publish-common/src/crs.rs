//! EPSG code of the active spatial reference.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// An EPSG coordinate reference system code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpsgCode(pub u32);

impl EpsgCode {
    /// Extract the EPSG code from shell-style projection info (`key=value` pairs).
    ///
    /// Prefers an explicit `epsg` entry and falls back to an `srid` of the
    /// form `EPSG:<code>`.
    pub fn from_projection_info(info: &HashMap<String, String>) -> Result<Self, CrsParseError> {
        if let Some(code) = info.get("epsg") {
            return Self::parse_code(code);
        }

        if let Some(srid) = info.get("srid") {
            let code = srid
                .trim()
                .strip_prefix("EPSG:")
                .ok_or_else(|| CrsParseError::UnsupportedSrid(srid.clone()))?;
            return Self::parse_code(code);
        }

        Err(CrsParseError::Missing)
    }

    /// Parse a bare code or an `EPSG:<code>` string.
    pub fn parse(s: &str) -> Result<Self, CrsParseError> {
        let s = s.trim();
        let code = s
            .strip_prefix("EPSG:")
            .or_else(|| s.strip_prefix("epsg:"))
            .unwrap_or(s);
        Self::parse_code(code)
    }

    fn parse_code(code: &str) -> Result<Self, CrsParseError> {
        code.trim()
            .parse::<u32>()
            .map(EpsgCode)
            .map_err(|_| CrsParseError::InvalidCode(code.to_string()))
    }

    pub fn code(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for EpsgCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrsParseError {
    #[error("Projection info has neither 'epsg' nor 'srid' entry")]
    Missing,

    #[error("SRID is not an EPSG reference: {0}")]
    UnsupportedSrid(String),

    #[error("Invalid EPSG code: {0}")]
    InvalidCode(String),
}
