//! HTTP request handlers.
//!
//! - `heatmap`: `POST /heatmap`
//! - `metrics`: health check, Prometheus and JSON metrics

pub mod heatmap;
pub mod metrics;

pub use heatmap::{heatmap_handler, HeatmapResponse};
pub use metrics::{api_metrics_handler, health_handler, metrics_handler};
