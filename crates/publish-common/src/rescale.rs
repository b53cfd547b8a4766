//! Linear rescale of native cell values onto the display range.
//!
//! Value 0 is the tile renderer's no-data sentinel, so rescaled cells live
//! in `[1, 255]`.

use serde::{Deserialize, Serialize};

/// Reserved no-data value of rescaled grids.
pub const NODATA_VALUE: f64 = 0.0;

/// Lowest rescaled value (cells at or below the global minimum).
pub const RESCALED_MIN: f64 = 1.0;

/// Highest rescaled value (cells above the global maximum).
pub const RESCALED_MAX: f64 = 255.0;

/// A series-wide linear transform; `global_max > global_min` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RescaleTransform {
    global_min: f64,
    global_max: f64,
}

impl RescaleTransform {
    pub fn new(global_min: f64, global_max: f64) -> Result<Self, DegenerateRange> {
        if !(global_max > global_min) || !global_min.is_finite() || !global_max.is_finite() {
            return Err(DegenerateRange {
                min: global_min,
                max: global_max,
            });
        }
        Ok(Self {
            global_min,
            global_max,
        })
    }

    pub fn global_min(&self) -> f64 {
        self.global_min
    }

    pub fn global_max(&self) -> f64 {
        self.global_max
    }

    /// Rescale a single cell value.
    pub fn apply(&self, value: f64) -> f64 {
        if value <= self.global_min {
            RESCALED_MIN
        } else if value > self.global_max {
            RESCALED_MAX
        } else {
            RESCALED_MIN
                + (RESCALED_MAX - RESCALED_MIN) * (value - self.global_min)
                    / (self.global_max - self.global_min)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("Degenerate rescale range: global min {min} and global max {max} do not span a range")]
pub struct DegenerateRange {
    pub min: f64,
    pub max: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_rejected() {
        assert!(RescaleTransform::new(5.0, 5.0).is_err());
        assert!(RescaleTransform::new(6.0, 5.0).is_err());
        assert!(RescaleTransform::new(f64::NAN, 5.0).is_err());
    }

    #[test]
    fn test_apply_bounds() {
        let t = RescaleTransform::new(10.0, 20.0).unwrap();
        assert_eq!(t.apply(-100.0), 1.0);
        assert_eq!(t.apply(10.0), 1.0);
        assert_eq!(t.apply(15.0), 128.0);
        assert_eq!(t.apply(20.0), 255.0);
        assert_eq!(t.apply(20.5), 255.0);
    }

    #[test]
    fn test_apply_monotonic() {
        let t = RescaleTransform::new(-3.5, 42.0).unwrap();
        let mut prev = f64::MIN;
        for i in -100..=500 {
            let v = t.apply(i as f64 * 0.1);
            assert!(v >= RESCALED_MIN && v <= RESCALED_MAX);
            assert!(v >= prev);
            prev = v;
        }
    }
}
