//! Color mapping for density values.

/// Color value in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Source-over blend of `self` onto `dst` with a constant alpha.
    ///
    /// The result keeps the destination's alpha.
    pub fn blend_over(self, dst: [u8; 4], alpha: f32) -> [u8; 4] {
        let a = alpha.clamp(0.0, 1.0);
        let mix = |src: u8, dst: u8| (src as f32 * a + dst as f32 * (1.0 - a)).round() as u8;
        [mix(self.r, dst[0]), mix(self.g, dst[1]), mix(self.b, dst[2]), dst[3]]
    }
}

// Jet segment data: (position, intensity) anchors per channel.
const JET_RED: [(f32, f32); 5] = [(0.0, 0.0), (0.35, 0.0), (0.66, 1.0), (0.89, 1.0), (1.0, 0.5)];
const JET_GREEN: [(f32, f32); 6] = [
    (0.0, 0.0),
    (0.125, 0.0),
    (0.375, 1.0),
    (0.64, 1.0),
    (0.91, 0.0),
    (1.0, 0.0),
];
const JET_BLUE: [(f32, f32); 5] = [(0.0, 0.5), (0.11, 1.0), (0.34, 1.0), (0.65, 0.0), (1.0, 0.0)];

fn piecewise(anchors: &[(f32, f32)], v: f32) -> f32 {
    for pair in anchors.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if v <= x1 {
            let t = if x1 > x0 { (v - x0) / (x1 - x0) } else { 0.0 };
            return y0 + (y1 - y0) * t;
        }
    }
    anchors.last().map(|&(_, y)| y).unwrap_or(0.0)
}

/// Jet colormap: dark blue -> blue -> cyan -> yellow -> red -> dark red.
///
/// `v` is a normalized value; it is clamped to `[0, 1]`.
pub fn jet(v: f32) -> Color {
    let v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
    let channel = |anchors: &[(f32, f32)]| (piecewise(anchors, v) * 255.0).round() as u8;
    Color::new(channel(&JET_RED), channel(&JET_GREEN), channel(&JET_BLUE), 255)
}

/// Normalize `value` into `[0, 1]` over `[min_val, max_val]`.
///
/// A degenerate range maps everything to 0.
pub fn normalize(value: f32, min_val: f32, max_val: f32) -> f32 {
    let range = max_val - min_val;
    if range.abs() < f32::EPSILON {
        return 0.0;
    }
    ((value - min_val) / range).clamp(0.0, 1.0)
}

/// Render grid data as RGBA pixels
///
/// # Arguments
/// - `data`: 2D grid of values (row-major order)
/// - `width`: Number of columns
/// - `height`: Number of rows
/// - `min_val`: Minimum value in the data (for scaling)
/// - `max_val`: Maximum value in the data (for scaling)
/// - `color_fn`: Function to convert a normalized value (0-1) to a color
///
/// # Returns
/// RGBA pixel data (4 bytes per pixel)
pub fn render_grid<F>(
    data: &[f32],
    width: usize,
    height: usize,
    min_val: f32,
    max_val: f32,
    color_fn: F,
) -> Vec<u8>
where
    F: Fn(f32) -> Color,
{
    let mut pixels = vec![0u8; width * height * 4];

    for (idx, value) in data.iter().take(width * height).enumerate() {
        let color = color_fn(normalize(*value, min_val, max_val));
        pixels[idx * 4..idx * 4 + 4].copy_from_slice(&color.to_rgba());
    }

    pixels
}
