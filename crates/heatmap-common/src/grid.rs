//! Fixed binning grid for event coordinates.
//!
//! The grid has integer bin edges `0, 1, ..., bound - 1` on both axes, so a
//! bound of 1024 yields 1023 x 1023 bins. Bin `i` covers `[i, i + 1)` except
//! the last bin, which is closed on the right.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{HeatmapError, HeatmapResult};
use crate::points::Point;

/// Default number of bin edges per axis.
pub const DEFAULT_GRID_BOUND: usize = 1024;

/// What to do with a point that falls outside the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutOfRangePolicy {
    /// Silently exclude the point.
    #[default]
    Drop,
    /// Clamp the point into the nearest edge bin.
    Clip,
    /// Fail the request.
    Reject,
}

impl FromStr for OutOfRangePolicy {
    type Err = HeatmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "clip" => Ok(Self::Clip),
            "reject" => Ok(Self::Reject),
            other => Err(HeatmapError::invalid_parameter(
                "out_of_range",
                format!("expected drop, clip or reject, got '{}'", other),
            )),
        }
    }
}

impl fmt::Display for OutOfRangePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Drop => "drop",
            Self::Clip => "clip",
            Self::Reject => "reject",
        };
        write!(f, "{}", s)
    }
}

/// Specification of the square binning grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Number of bin edges per axis
    pub bound: usize,
    /// Handling of points outside `[0, bound - 1]`
    pub policy: OutOfRangePolicy,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            bound: DEFAULT_GRID_BOUND,
            policy: OutOfRangePolicy::Drop,
        }
    }
}

impl GridSpec {
    /// Create a grid specification. At least two edges are needed for one bin.
    pub fn new(bound: usize, policy: OutOfRangePolicy) -> HeatmapResult<Self> {
        if bound < 2 {
            return Err(HeatmapError::invalid_parameter(
                "grid_bound",
                format!("at least 2 bin edges are required, got {}", bound),
            ));
        }
        Ok(Self { bound, policy })
    }

    /// Bin edges along one axis.
    pub fn bin_edges(&self) -> Vec<f64> {
        (0..self.bound).map(|e| e as f64).collect()
    }

    /// Number of bins along one axis.
    pub fn bin_count(&self) -> usize {
        self.bound - 1
    }

    /// Value of the last bin edge.
    pub fn upper_edge(&self) -> f64 {
        (self.bound - 1) as f64
    }

    /// Bin containing `v`, or `None` if it lies outside the edges.
    pub fn bin_index(&self, v: f64) -> Option<usize> {
        if v.is_nan() || v < 0.0 || v > self.upper_edge() {
            return None;
        }
        Some((v.floor() as usize).min(self.bin_count() - 1))
    }

    /// Locate a point on the grid according to the out-of-range policy.
    ///
    /// Returns `(x_bin, y_bin)`, `None` for a dropped point.
    pub fn locate(&self, point: Point) -> HeatmapResult<Option<(usize, usize)>> {
        let located = match self.policy {
            OutOfRangePolicy::Clip => {
                let clamp = |v: f64| v.clamp(0.0, self.upper_edge());
                self.bin_index(clamp(point.x)).zip(self.bin_index(clamp(point.y)))
            }
            _ => self.bin_index(point.x).zip(self.bin_index(point.y)),
        };

        if located.is_none() && self.policy == OutOfRangePolicy::Reject {
            return Err(HeatmapError::InvalidCoordinates(format!(
                "point ({}, {}) lies outside the grid [0, {}]",
                point.x,
                point.y,
                self.upper_edge()
            )));
        }

        Ok(located)
    }
}
