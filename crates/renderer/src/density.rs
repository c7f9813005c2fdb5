//! Density grid building: fixed-grid histogram followed by Gaussian smoothing.
//!
//! The smoothing matches the usual numeric-library defaults for an isotropic
//! Gaussian filter:
//! - kernel truncated at 4 standard deviations (radius `floor(4σ + 0.5)`)
//! - weights normalized to sum to 1
//! - reflective boundary (`d c b a | a b c d | d c b a`)
//!
//! A sigma of 0 leaves the histogram untouched.

use heatmap_common::{AggregatedPoints, GridSpec, HeatmapError, HeatmapResult};
use rayon::prelude::*;
use tracing::debug;

/// Kernel truncation in standard deviations.
const TRUNCATE: f64 = 4.0;

/// Raw 2D histogram (row-major, row = y bin, column = x bin).
#[derive(Debug, Clone)]
pub struct Histogram {
    pub counts: Vec<f32>,
    pub width: usize,
    pub height: usize,
    /// Number of occurrences excluded because they fell outside the grid
    pub dropped: u64,
}

impl Histogram {
    pub fn count_at(&self, x_bin: usize, y_bin: usize) -> f32 {
        self.counts[y_bin * self.width + x_bin]
    }
}

/// Smoothed density over the binning grid, plus the inputs the precise
/// renderer needs.
#[derive(Debug, Clone)]
pub struct DensityField {
    /// Smoothed values, row-major (row = y bin)
    pub values: Vec<f32>,
    pub width: usize,
    pub height: usize,
    pub x_edges: Vec<f64>,
    pub y_edges: Vec<f64>,
    /// Per distinct point frequencies, before binning
    pub frequencies: Vec<u32>,
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub sigma: u32,
    pub dropped: u64,
}

impl DensityField {
    pub fn value_at(&self, x_bin: usize, y_bin: usize) -> f32 {
        self.values[y_bin * self.width + x_bin]
    }

    /// `(min, max)` of the smoothed values.
    pub fn value_range(&self) -> (f32, f32) {
        self.values
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }

    pub fn max_value(&self) -> f32 {
        self.value_range().1
    }

    /// Coordinate frame of the grid: `[x_first, x_last, y_first, y_last]`.
    pub fn extent(&self) -> [f64; 4] {
        let first_last = |edges: &[f64]| {
            (
                edges.first().copied().unwrap_or(0.0),
                edges.last().copied().unwrap_or(0.0),
            )
        };
        let (x0, x1) = first_last(&self.x_edges);
        let (y0, y1) = first_last(&self.y_edges);
        [x0, x1, y0, y1]
    }
}

/// Accumulate each distinct point's frequency into its grid bin.
pub fn histogram(points: &AggregatedPoints, grid: &GridSpec) -> HeatmapResult<Histogram> {
    let bins = grid.bin_count();
    let mut counts = vec![0.0f32; bins * bins];
    let mut dropped = 0u64;

    for (point, freq) in points.iter() {
        match grid.locate(point)? {
            Some((xb, yb)) => counts[yb * bins + xb] += freq as f32,
            None => dropped += freq as u64,
        }
    }

    Ok(Histogram {
        counts,
        width: bins,
        height: bins,
        dropped,
    })
}

/// Normalized 1D Gaussian kernel of length `2 * radius + 1`.
pub fn gaussian_kernel(sigma: f64) -> Vec<f32> {
    if sigma <= 0.0 {
        return vec![1.0];
    }
    let radius = (TRUNCATE * sigma + 0.5) as i64;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|x| (-0.5 * (x as f64 / sigma).powi(2)).exp())
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.iter().map(|w| (w / sum) as f32).collect()
}

/// Map an out-of-bounds index back into `0..n` by mirror reflection.
fn reflect(i: i64, n: usize) -> usize {
    let n = n as i64;
    let period = 2 * n;
    let m = i.rem_euclid(period);
    if m < n {
        m as usize
    } else {
        (period - 1 - m) as usize
    }
}

/// Separable Gaussian blur over a row-major grid.
pub fn gaussian_filter(values: &[f32], width: usize, height: usize, sigma: f64) -> Vec<f32> {
    if sigma <= 0.0 || width == 0 || height == 0 {
        return values.to_vec();
    }

    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as i64;

    // Horizontal pass
    let mut horizontal = vec![0.0f32; width * height];
    horizontal
        .par_chunks_mut(width)
        .zip(values.par_chunks(width))
        .for_each(|(out_row, in_row)| {
            for (x, out) in out_row.iter_mut().enumerate() {
                let mut acc = 0.0f32;
                for (k, w) in kernel.iter().enumerate() {
                    let sx = reflect(x as i64 + k as i64 - radius, width);
                    acc += w * in_row[sx];
                }
                *out = acc;
            }
        });

    // Vertical pass
    let mut output = vec![0.0f32; width * height];
    output
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, out_row)| {
            for (k, w) in kernel.iter().enumerate() {
                let sy = reflect(y as i64 + k as i64 - radius, height);
                let src = &horizontal[sy * width..(sy + 1) * width];
                for (out, v) in out_row.iter_mut().zip(src) {
                    *out += w * v;
                }
            }
        });

    output
}

/// Bin the aggregated points and smooth the result with bandwidth `sigma`.
///
/// `sigma` may not exceed the number of bins per axis.
pub fn build_density(
    points: &AggregatedPoints,
    grid: &GridSpec,
    sigma: u32,
) -> HeatmapResult<DensityField> {
    if sigma as usize > grid.bin_count() {
        return Err(HeatmapError::invalid_parameter(
            "sigma",
            format!("must be at most {} for this grid, got {}", grid.bin_count(), sigma),
        ));
    }

    let hist = histogram(points, grid)?;
    if hist.dropped > 0 {
        debug!(dropped = hist.dropped, "Points outside the grid were excluded");
    }

    let values = gaussian_filter(&hist.counts, hist.width, hist.height, sigma as f64);

    Ok(DensityField {
        values,
        width: hist.width,
        height: hist.height,
        x_edges: grid.bin_edges(),
        y_edges: grid.bin_edges(),
        frequencies: points.frequencies().to_vec(),
        xs: points.xs(),
        ys: points.ys(),
        sigma,
        dropped: hist.dropped,
    })
}
