//! Common types and utilities shared across the heatmap crates.

pub mod error;
pub mod grid;
pub mod points;
pub mod request;

pub use error::{HeatmapError, HeatmapResult};
pub use grid::{GridSpec, OutOfRangePolicy, DEFAULT_GRID_BOUND};
pub use points::{aggregate, aggregate_points, AggregatedPoints, Point};
pub use request::{HeatmapRequest, RenderMode, DEFAULT_MAX_SIGMA, DEFAULT_SIGMA};
