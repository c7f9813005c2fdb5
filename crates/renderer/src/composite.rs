//! Compositing of density data over a background map.
//!
//! Two render variants share one entry point, [`render_heatmap`]:
//! - **Smoothed**: background stretched to the grid extent with the jet
//!   colored density blended on top at a fixed alpha.
//! - **Precise**: background at native resolution with one filled marker per
//!   distinct point, colored by its frequency.
//!
//! Both get a vertical colorbar appended on the right.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use heatmap_common::{AggregatedPoints, GridSpec, HeatmapError, HeatmapResult, RenderMode};
use image::imageops::{self, FilterType};
use image::{GenericImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use rusttype::{Font, Scale};
use tracing::debug;

use crate::colormap::{jet, normalize, render_grid, Color};
use crate::density::{build_density, DensityField};
use crate::png::create_png_auto;

const FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Rendering parameters that do not come from the request.
#[derive(Clone)]
pub struct RenderOptions {
    /// Opacity of the smoothed density layer
    pub overlay_alpha: f32,
    /// Marker radius in pixels for precise mode
    pub marker_radius: i32,
    pub colorbar_width: u32,
    /// Gap between plot and colorbar, also used as vertical padding
    pub colorbar_margin: u32,
    /// Font for colorbar ticks and caption; the colorbar is unlabelled without one.
    /// Defaults to the bundled DejaVu Sans Mono.
    pub font: Option<Arc<Font<'static>>>,
    pub font_size: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            overlay_alpha: 0.3,
            marker_radius: 3,
            colorbar_width: 24,
            colorbar_margin: 12,
            font: embedded_font(),
            font_size: 14.0,
        }
    }
}

impl std::fmt::Debug for RenderOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderOptions")
            .field("overlay_alpha", &self.overlay_alpha)
            .field("marker_radius", &self.marker_radius)
            .field("colorbar_width", &self.colorbar_width)
            .field("colorbar_margin", &self.colorbar_margin)
            .field("font", &self.font.is_some())
            .field("font_size", &self.font_size)
            .finish()
    }
}

/// The bundled colorbar font.
pub fn embedded_font() -> Option<Arc<Font<'static>>> {
    Font::try_from_bytes(FONT_DATA).map(Arc::new)
}

/// Load a TrueType font from disk.
pub fn load_font(path: &Path) -> HeatmapResult<Font<'static>> {
    let bytes = std::fs::read(path)?;
    Font::try_from_vec(bytes).ok_or_else(|| {
        HeatmapError::ImageError(format!("'{}' is not a valid TrueType font", path.display()))
    })
}

/// Path of the background image for `map` inside `maps_dir`.
pub fn background_path(maps_dir: &Path, map: &str) -> PathBuf {
    maps_dir.join(format!("{}.png", map))
}

/// Load the background map named `map` from `maps_dir`.
///
/// A missing file is reported as [`HeatmapError::MapNotFound`].
pub fn load_background(maps_dir: &Path, map: &str) -> HeatmapResult<RgbaImage> {
    let path = background_path(maps_dir, map);
    if !path.is_file() {
        return Err(HeatmapError::MapNotFound(map.to_string()));
    }
    let img = image::open(&path)
        .map_err(|e| HeatmapError::ImageError(format!("{}: {}", path.display(), e)))?;
    Ok(img.to_rgba8())
}

/// Overlay the density field on the background stretched to the grid size.
pub fn render_smoothed(background: &RgbaImage, field: &DensityField, opts: &RenderOptions) -> RgbaImage {
    let (w, h) = (field.width as u32, field.height as u32);
    let mut canvas = imageops::resize(background, w, h, FilterType::Triangle);

    let (min, max) = field.value_range();
    let overlay = render_grid(&field.values, field.width, field.height, min, max, jet);

    for (px, rgba) in canvas.pixels_mut().zip(overlay.chunks_exact(4)) {
        let color = Color::new(rgba[0], rgba[1], rgba[2], rgba[3]);
        px.0 = color.blend_over(px.0, opts.overlay_alpha);
    }

    canvas
}

/// Draw one marker per distinct point on top of the background.
pub fn render_precise(background: &RgbaImage, points: &AggregatedPoints, opts: &RenderOptions) -> RgbaImage {
    let mut canvas = background.clone();
    let (min, max) = frequency_range(points.frequencies());
    let radius = opts.marker_radius.max(1);
    let (w, h) = (canvas.width() as f64, canvas.height() as f64);
    let reach = radius as f64;

    let mut drawn = 0usize;
    for (point, freq) in points.iter() {
        // Entirely outside the image: nothing to draw
        if point.x < -reach || point.y < -reach || point.x > w + reach || point.y > h + reach {
            continue;
        }
        let color = jet(normalize(freq as f32, min, max));
        let center = (point.x.round() as i32, point.y.round() as i32);
        draw_filled_circle_mut(&mut canvas, center, radius, Rgba(color.to_rgba()));
        drawn += 1;
    }
    debug!(markers = drawn, total = points.len(), "Drew precise markers");

    canvas
}

fn frequency_range(frequencies: &[u32]) -> (f32, f32) {
    let min = frequencies.iter().copied().min().unwrap_or(0);
    let max = frequencies.iter().copied().max().unwrap_or(0);
    (min as f32, max as f32)
}

/// Format a colorbar tick value.
fn format_tick(value: f32) -> String {
    if value.fract() == 0.0 && value.abs() < 1e6 {
        format!("{:.0}", value)
    } else if value.abs() >= 0.01 {
        format!("{:.2}", value)
    } else {
        format!("{:.1e}", value)
    }
}

/// Append a vertical jet colorbar for `[min, max]` to the right of `plot`.
///
/// With a font configured the min and max ticks and a rotated caption are
/// drawn next to the strip.
pub fn draw_colorbar(
    plot: &RgbaImage,
    min: f32,
    max: f32,
    label: &str,
    opts: &RenderOptions,
) -> HeatmapResult<RgbaImage> {
    let margin = opts.colorbar_margin;
    let bar_w = opts.colorbar_width.max(1);
    let scale = Scale::uniform(opts.font_size);

    let ticks = [format_tick(max), format_tick(min)];
    let caption = format!("{} frequency", label);

    let label_w = match opts.font.as_deref() {
        Some(font) => {
            let tick_w = ticks
                .iter()
                .map(|t| text_size(scale, font, t).0.max(0) as u32)
                .max()
                .unwrap_or(0);
            let (_, caption_h) = text_size(scale, font, &caption);
            margin / 2 + tick_w + margin / 2 + caption_h.max(0) as u32 + margin / 2
        }
        None => margin,
    };

    let (plot_w, plot_h) = plot.dimensions();
    let out_w = plot_w + margin + bar_w + label_w;
    let mut out = RgbaImage::from_pixel(out_w, plot_h, WHITE);
    out.copy_from(plot, 0, 0)
        .map_err(|e| HeatmapError::ImageError(format!("colorbar composition failed: {}", e)))?;

    let bar_x = plot_w + margin;
    let (bar_top, bar_bottom) = if plot_h > 2 * margin + 1 {
        (margin, plot_h - margin)
    } else {
        (0, plot_h)
    };
    let bar_h = bar_bottom - bar_top;

    for row in 0..bar_h {
        // Top of the strip is the maximum
        let t = if bar_h > 1 {
            1.0 - row as f32 / (bar_h - 1) as f32
        } else {
            1.0
        };
        let color = Rgba(jet(t).to_rgba());
        for col in 0..bar_w {
            out.put_pixel(bar_x + col, bar_top + row, color);
        }
    }
    if bar_h > 0 {
        draw_hollow_rect_mut(
            &mut out,
            Rect::at(bar_x as i32, bar_top as i32).of_size(bar_w, bar_h),
            BLACK,
        );
    }

    if let Some(font) = opts.font.as_deref() {
        let text_x = (bar_x + bar_w + margin / 2) as i32;
        let (_, tick_h) = text_size(scale, font, &ticks[1]);
        draw_text_mut(&mut out, BLACK, text_x, bar_top as i32, scale, font, &ticks[0]);
        draw_text_mut(
            &mut out,
            BLACK,
            text_x,
            bar_bottom as i32 - tick_h,
            scale,
            font,
            &ticks[1],
        );

        let (cap_w, cap_h) = text_size(scale, font, &caption);
        if cap_w > 0 && cap_h > 0 {
            let mut caption_img = RgbaImage::from_pixel(cap_w as u32, cap_h as u32, Rgba([0, 0, 0, 0]));
            draw_text_mut(&mut caption_img, BLACK, 0, 0, scale, font, &caption);
            let rotated = imageops::rotate270(&caption_img);
            let cap_x = out_w as i64 - margin as i64 / 2 - rotated.width() as i64;
            let cap_y = (plot_h as i64 - rotated.height() as i64) / 2;
            imageops::overlay(&mut out, &rotated, cap_x, cap_y);
        }
    }

    Ok(out)
}

/// Render one heatmap image for `mode`.
///
/// The Gaussian density is only built for the smoothed variant; the precise
/// variant works from the distinct points and their frequencies directly.
pub fn render_heatmap(
    mode: RenderMode,
    background: &RgbaImage,
    points: &AggregatedPoints,
    grid: &GridSpec,
    sigma: u32,
    label: &str,
    opts: &RenderOptions,
) -> HeatmapResult<RgbaImage> {
    match mode {
        RenderMode::Smoothed => {
            let field = build_density(points, grid, sigma)?;
            let plot = render_smoothed(background, &field, opts);
            let (min, max) = field.value_range();
            draw_colorbar(&plot, min, max, label, opts)
        }
        RenderMode::Precise => {
            let plot = render_precise(background, points, opts);
            let (min, max) = frequency_range(points.frequencies());
            draw_colorbar(&plot, min, max, label, opts)
        }
    }
}

/// Encode an image with the in-house PNG encoder.
pub fn encode_png(img: &RgbaImage) -> HeatmapResult<Vec<u8>> {
    create_png_auto(img.as_raw(), img.width() as usize, img.height() as usize)
}

/// Encode and write `img` to `path`.
///
/// The bytes go to a temporary sibling first and are renamed into place, so
/// readers never observe a partial file.
pub fn save_png(img: &RgbaImage, path: &Path) -> HeatmapResult<usize> {
    let bytes = encode_png(img)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| HeatmapError::InternalError(format!("invalid output path {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    std::fs::write(&tmp, &bytes)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(bytes.len())
}
