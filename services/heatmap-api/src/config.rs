//! Service configuration.
//!
//! Loaded from environment variables (`from_env`) or a YAML file
//! (`from_yaml_file`). Every key has a default so an empty environment yields
//! a working local setup rooted at `./resources`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use heatmap_common::{
    GridSpec, HeatmapResult, OutOfRangePolicy, RenderMode, DEFAULT_GRID_BOUND, DEFAULT_MAX_SIGMA,
};
use storage::{ObjectStorageConfig, DEFAULT_CONTENT_TYPE};

/// Deployment environment, from `MODEL_ENVIRONMENT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Testing,
    Development,
    Production,
}

impl Environment {
    /// Whether `POST /heatmap` is registered when no explicit override is set.
    ///
    /// Only the testing environment exposes it by default.
    pub fn heatmap_route_default(&self) -> bool {
        match self {
            Environment::Testing => true,
            Environment::Development | Environment::Production => false,
        }
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "testing" | "test" => Ok(Environment::Testing),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => anyhow::bail!("unknown environment '{}'", other),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Environment::Testing => "testing",
            Environment::Development => "development",
            Environment::Production => "production",
        };
        write!(f, "{}", s)
    }
}

/// Route registration overrides. `None` falls back to the environment default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    pub heatmap: Option<bool>,
}

/// Upload of rendered images to object storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub enabled: bool,
    /// Key prefix inside the bucket
    pub prefix: Option<String>,
    pub content_type: String,
    pub storage: ObjectStorageConfig,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            prefix: None,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            storage: ObjectStorageConfig::default(),
        }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    pub environment: Environment,
    /// Root holding `maps/`, `heatmaps/` and `precisemaps/`
    pub resources_dir: PathBuf,
    /// Number of bin edges per axis
    pub grid_bound: usize,
    pub out_of_range: OutOfRangePolicy,
    /// Largest accepted smoothing bandwidth
    pub max_sigma: u32,
    /// TrueType font for colorbar labels
    pub font_path: Option<PathBuf>,
    /// Append a random token to every output filename
    pub unique_filenames: bool,
    pub routes: RouteConfig,
    pub upload: UploadConfig,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            resources_dir: PathBuf::from("resources"),
            grid_bound: DEFAULT_GRID_BOUND,
            out_of_range: OutOfRangePolicy::default(),
            max_sigma: DEFAULT_MAX_SIGMA,
            font_path: None,
            unique_filenames: false,
            routes: RouteConfig::default(),
            upload: UploadConfig::default(),
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("{} must be a boolean, got '{}'", key, other),
    }
}

impl HeatmapConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build configuration from a variable lookup, falling back to defaults.
    pub fn from_vars<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        let get_bool = |key: &str, default: bool| -> Result<bool> {
            get(key).map(|v| parse_bool(key, &v)).unwrap_or(Ok(default))
        };

        let environment = match get("MODEL_ENVIRONMENT") {
            Some(v) => v.parse()?,
            None => defaults.environment,
        };

        let grid_bound = match get("HEATMAP_GRID_BOUND") {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .with_context(|| format!("HEATMAP_GRID_BOUND must be an integer, got '{}'", v))?,
            None => defaults.grid_bound,
        };

        let out_of_range = match get("HEATMAP_OUT_OF_RANGE") {
            Some(v) => v.parse::<OutOfRangePolicy>()?,
            None => defaults.out_of_range,
        };

        let max_sigma = match get("HEATMAP_MAX_SIGMA") {
            Some(v) => v
                .trim()
                .parse::<u32>()
                .with_context(|| format!("HEATMAP_MAX_SIGMA must be a non-negative integer, got '{}'", v))?,
            None => defaults.max_sigma,
        };

        let storage_defaults = ObjectStorageConfig::default();
        let storage = ObjectStorageConfig {
            endpoint: get("S3_ENDPOINT").unwrap_or(storage_defaults.endpoint),
            bucket: get("S3_BUCKET").unwrap_or(storage_defaults.bucket),
            access_key_id: get("S3_ACCESS_KEY").unwrap_or(storage_defaults.access_key_id),
            secret_access_key: get("S3_SECRET_KEY").unwrap_or(storage_defaults.secret_access_key),
            region: get("S3_REGION").unwrap_or(storage_defaults.region),
            allow_http: get_bool("S3_ALLOW_HTTP", storage_defaults.allow_http)?,
        };

        let routes = RouteConfig {
            heatmap: get("HEATMAP_ROUTE_ENABLED")
                .map(|v| parse_bool("HEATMAP_ROUTE_ENABLED", &v))
                .transpose()?,
        };

        let config = Self {
            environment,
            resources_dir: get("HEATMAP_RESOURCES_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.resources_dir),
            grid_bound,
            out_of_range,
            max_sigma,
            font_path: get("HEATMAP_FONT_PATH").map(PathBuf::from),
            unique_filenames: get_bool("HEATMAP_UNIQUE_FILENAMES", false)?,
            routes,
            upload: UploadConfig {
                enabled: get_bool("HEATMAP_UPLOAD_ENABLED", false)?,
                prefix: get("HEATMAP_UPLOAD_PREFIX"),
                content_type: DEFAULT_CONTENT_TYPE.to_string(),
                storage,
            },
        };

        config.grid()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.grid()?;
        Ok(config)
    }

    /// Binning grid described by this configuration.
    pub fn grid(&self) -> HeatmapResult<GridSpec> {
        GridSpec::new(self.grid_bound, self.out_of_range)
    }

    /// Upper bound for `sigma`, never wider than the grid.
    pub fn effective_max_sigma(&self) -> u32 {
        let bins = u32::try_from(self.grid_bound.saturating_sub(1)).unwrap_or(u32::MAX);
        self.max_sigma.min(bins)
    }

    pub fn heatmap_route_enabled(&self) -> bool {
        self.routes
            .heatmap
            .unwrap_or_else(|| self.environment.heatmap_route_default())
    }

    pub fn maps_dir(&self) -> PathBuf {
        self.resources_dir.join("maps")
    }

    pub fn output_dir(&self, mode: RenderMode) -> PathBuf {
        self.resources_dir.join(mode.output_dir())
    }
}
