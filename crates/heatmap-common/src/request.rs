//! Heatmap request model and render mode.

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{HeatmapError, HeatmapResult};

/// Default Gaussian smoothing bandwidth.
pub const DEFAULT_SIGMA: i64 = 16;

/// Default upper bound accepted for `sigma`.
pub const DEFAULT_MAX_SIGMA: u32 = 128;

fn default_sigma() -> i64 {
    DEFAULT_SIGMA
}

/// Accept integers and whole-number floats such as `16.0`.
fn deserialize_sigma<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if let Value::Number(n) = &value {
        if let Some(i) = n.as_i64() {
            return Ok(i);
        }
        if let Some(f) = n.as_f64() {
            if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                return Ok(f as i64);
            }
        }
    }
    Err(de::Error::custom(format!(
        "sigma must be an integer, got {}",
        value
    )))
}

/// Body of `POST /heatmap`.
///
/// Coordinates are kept as raw JSON so a malformed record is reported by the
/// aggregator with the record quoted, instead of as an opaque body rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatmapRequest {
    pub coordinates: Vec<Value>,
    pub played_map: String,
    pub event: String,
    /// `true` selects the precise scatter render, `false` the smoothed heatmap.
    #[serde(rename = "isAccurate", default)]
    pub is_accurate: bool,
    #[serde(default = "default_sigma", deserialize_with = "deserialize_sigma")]
    pub sigma: i64,
}

impl HeatmapRequest {
    pub fn mode(&self) -> RenderMode {
        RenderMode::from_accurate(self.is_accurate)
    }

    /// Validate the scalar fields (names and sigma).
    ///
    /// Names end up in file paths, so separators and parent references are
    /// refused.
    pub fn validate(&self) -> HeatmapResult<()> {
        validate_name("played_map", &self.played_map)?;
        validate_name("event", &self.event)?;
        self.sigma_value()?;
        Ok(())
    }

    /// Smoothing bandwidth, checked against `max_sigma`.
    ///
    /// The blur kernel spans `8 * sigma + 1` cells, so the bound keeps the
    /// work per request proportional to the grid.
    pub fn sigma_within(&self, max_sigma: u32) -> HeatmapResult<u32> {
        let sigma = self.sigma_value()?;
        if sigma > max_sigma {
            return Err(HeatmapError::invalid_parameter(
                "sigma",
                format!("must be at most {}, got {}", max_sigma, sigma),
            ));
        }
        Ok(sigma)
    }

    /// Smoothing bandwidth as an unsigned value.
    pub fn sigma_value(&self) -> HeatmapResult<u32> {
        u32::try_from(self.sigma).map_err(|_| {
            HeatmapError::invalid_parameter(
                "sigma",
                format!("must be a non-negative integer, got {}", self.sigma),
            )
        })
    }
}

fn validate_name(param: &str, value: &str) -> HeatmapResult<()> {
    if value.trim().is_empty() {
        return Err(HeatmapError::invalid_parameter(param, "must not be empty"));
    }
    if value.contains('/') || value.contains('\\') || value.contains("..") || value.contains('\0')
    {
        return Err(HeatmapError::invalid_parameter(
            param,
            format!("'{}' must not contain path separators", value),
        ));
    }
    Ok(())
}

/// The two mutually exclusive render variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Individual markers colored by frequency, no smoothing.
    Precise,
    /// Gaussian-blurred density as a translucent overlay.
    Smoothed,
}

impl RenderMode {
    pub fn from_accurate(is_accurate: bool) -> Self {
        if is_accurate {
            RenderMode::Precise
        } else {
            RenderMode::Smoothed
        }
    }

    /// Filename suffix for this mode.
    pub fn suffix(&self) -> &'static str {
        match self {
            RenderMode::Precise => "precise",
            RenderMode::Smoothed => "heatmap",
        }
    }

    /// Output directory (relative to the resources root).
    pub fn output_dir(&self) -> &'static str {
        match self {
            RenderMode::Precise => "precisemaps",
            RenderMode::Smoothed => "heatmaps",
        }
    }

    /// Build the output filename `<map>-<event>-<suffix>[-<token>].png`.
    pub fn filename(&self, played_map: &str, event: &str, token: Option<&str>) -> String {
        match token {
            Some(token) => format!("{}-{}-{}-{}.png", played_map, event, self.suffix(), token),
            None => format!("{}-{}-{}.png", played_map, event, self.suffix()),
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RenderMode::Precise => "precise",
            RenderMode::Smoothed => "smoothed",
        };
        write!(f, "{}", s)
    }
}
