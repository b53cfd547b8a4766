//! Parsers for the textual output of GRASS modules.

use std::collections::HashMap;

use publish_common::{parse_start_time, Timestep};

use crate::error::{StoreError, StoreResult};

/// Column separator requested from listing modules.
pub const LIST_SEPARATOR: char = '|';

/// Parse shell-style `key=value` lines (`g.proj -g`, `g.gisenv`).
///
/// Values may be quoted; lines without `=` are skipped.
pub fn parse_key_values(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| {
            let v = v.trim().trim_end_matches(';');
            let v = v.trim_matches(|c| c == '"' || c == '\'');
            (k.trim().to_string(), v.to_string())
        })
        .collect()
}

/// Parse a dataset listing, dropping any `@mapset` suffix.
pub fn parse_dataset_names(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| strip_mapset(l).to_string())
        .collect()
}

/// Name part of a possibly mapset-qualified name.
pub fn strip_mapset(name: &str) -> &str {
    name.split('@').next().unwrap_or(name)
}

/// Parse `r.quantile` output lines of the form `index:percentile:value`.
pub fn parse_quantiles(text: &str, expected: usize) -> StoreResult<Vec<f64>> {
    let values = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|line| {
            let value = line
                .splitn(3, ':')
                .nth(2)
                .ok_or_else(|| StoreError::parse("r.quantile", format!("malformed line '{}'", line)))?;
            value
                .trim()
                .parse::<f64>()
                .map_err(|_| StoreError::parse("r.quantile", format!("invalid value '{}'", value)))
        })
        .collect::<StoreResult<Vec<_>>>()?;

    if values.len() != expected {
        return Err(StoreError::parse(
            "r.quantile",
            format!("expected {} percentiles, got {}", expected, values.len()),
        ));
    }
    Ok(values)
}

/// Parse `t.rast.list` output with columns `name|start_time`.
pub fn parse_timesteps(text: &str) -> StoreResult<Vec<Timestep>> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|line| {
            let (name, start) = line.split_once(LIST_SEPARATOR).ok_or_else(|| {
                StoreError::parse("t.rast.list", format!("malformed line '{}'", line))
            })?;
            let start_time = parse_start_time(start).map_err(|e| {
                StoreError::parse(
                    "t.rast.list",
                    format!("map {} has no absolute start time: {}", name, e),
                )
            })?;
            Ok(Timestep::new(strip_mapset(name.trim()), start_time))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_values() {
        let info = parse_key_values("name=Lambert Conformal Conic\nepsg=3358\nsrid=\"EPSG:3358\"\n");
        assert_eq!(info.get("epsg").map(String::as_str), Some("3358"));
        assert_eq!(info.get("srid").map(String::as_str), Some("EPSG:3358"));

        let env = parse_key_values("MAPSET='modis_lst';\nLOCATION_NAME='nc_spm_08_grass7';\n");
        assert_eq!(env.get("MAPSET").map(String::as_str), Some("modis_lst"));
        assert_eq!(
            env.get("LOCATION_NAME").map(String::as_str),
            Some("nc_spm_08_grass7")
        );
    }

    #[test]
    fn test_parse_dataset_names() {
        let names = parse_dataset_names("LST_Day_monthly@modis_lst\nelevation@PERMANENT\n\n");
        assert_eq!(names, vec!["LST_Day_monthly", "elevation"]);
    }

    #[test]
    fn test_parse_quantiles() {
        let values = parse_quantiles("0:2.000000:13512.5\n1:98.000000:15237.25\n", 2).unwrap();
        assert_eq!(values, vec![13512.5, 15237.25]);

        assert!(parse_quantiles("0:2.000000:13512.5\n", 2).is_err());
        assert!(parse_quantiles("garbage\n", 1).is_err());
    }

    #[test]
    fn test_parse_timesteps() {
        let steps = parse_timesteps(
            "MOD11B3.A2015001.h11v05.single_LST_Day_6km|2015-01-01 00:00:00\n\
             MOD11B3.A2015032.h11v05.single_LST_Day_6km|2015-02-01 00:00:00\n",
        )
        .unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].map_name, "MOD11B3.A2015032.h11v05.single_LST_Day_6km");
        assert_eq!(steps[1].date_token(), "20150201");
    }

    #[test]
    fn test_parse_timesteps_relative_time_rejected() {
        let err = parse_timesteps("map_1|5\n").unwrap_err();
        assert!(err.to_string().contains("no absolute start time"));
    }
}
