//! Image rendering for event heatmaps.
//!
//! Implements the coordinate-to-image pipeline stages:
//! - Density grid building (histogram + Gaussian smoothing)
//! - Jet color mapping
//! - Compositing over a background map (smoothed overlay or precise scatter)
//! - PNG encoding

pub mod colormap;
pub mod composite;
pub mod density;
pub mod png;

pub use colormap::{jet, Color};
pub use composite::{render_heatmap, RenderOptions};
pub use density::{build_density, DensityField};
