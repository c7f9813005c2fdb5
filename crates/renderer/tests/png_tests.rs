//! Tests for PNG encoding.
//!
//! Every encoded image is decoded again with the `image` crate so the tests
//! check real decodability, not just the signature.

use renderer::colormap::{jet, render_grid};
use renderer::png::{create_png, create_png_auto, PNG_SIGNATURE};

// ============================================================================
// Helper functions
// ============================================================================

/// Decode PNG bytes back to raw RGBA
fn decode_rgba(png: &[u8]) -> (u32, u32, Vec<u8>) {
    let img = image::load_from_memory_with_format(png, image::ImageFormat::Png)
        .expect("encoder produced an undecodable PNG")
        .to_rgba8();
    (img.width(), img.height(), img.into_raw())
}

/// Color type byte from the IHDR chunk
fn color_type(png: &[u8]) -> u8 {
    // signature (8) + length (4) + "IHDR" (4) + width (4) + height (4) + depth (1)
    png[25]
}

/// Overlay-like data: a radial bump quantized to a few jet colors
fn overlay_pixels(width: usize, height: usize, levels: usize) -> Vec<u8> {
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let data: Vec<f32> = (0..width * height)
        .map(|i| {
            let (x, y) = ((i % width) as f32, (i / width) as f32);
            let d = ((x - cx).powi(2) + (y - cy).powi(2)).sqrt() / cx.max(1.0);
            let v = (1.0 - d).max(0.0);
            (v * levels as f32).floor() / levels as f32
        })
        .collect();
    render_grid(&data, width, height, 0.0, 1.0, jet)
}

// ============================================================================
// Basic PNG creation tests
// ============================================================================

#[test]
fn test_indexed_round_trip() {
    let pixels = [
        255, 0, 0, 255, // red
        0, 255, 0, 255, // green
        0, 255, 0, 255, // green
        255, 0, 0, 255, // red
    ];

    let png = create_png_auto(&pixels, 2, 2).unwrap();
    assert_eq!(&png[0..8], &PNG_SIGNATURE);
    assert_eq!(color_type(&png), 3);

    let (w, h, decoded) = decode_rgba(&png);
    assert_eq!((w, h), (2, 2));
    assert_eq!(decoded, pixels.to_vec());
}

#[test]
fn test_rgba_round_trip() {
    let pixels = [
        255, 0, 0, 255, // red
        0, 255, 0, 255, // green
        0, 0, 255, 255, // blue
        255, 255, 0, 255, // yellow
    ];

    let png = create_png(&pixels, 2, 2).unwrap();
    assert_eq!(color_type(&png), 6);
    let (_, _, decoded) = decode_rgba(&png);
    assert_eq!(decoded, pixels.to_vec());
}

#[test]
fn test_transparency_preserved() {
    let pixels = [
        255, 0, 0, 255, // red, opaque
        0, 0, 0, 0, // transparent
        0, 255, 0, 128, // green, semi-transparent
        0, 0, 255, 255, // blue, opaque
    ];

    let png = create_png_auto(&pixels, 2, 2).unwrap();
    let (_, _, decoded) = decode_rgba(&png);
    assert_eq!(decoded, pixels.to_vec());
}

// ============================================================================
// Format selection tests
// ============================================================================

#[test]
fn test_exactly_256_colors_stays_indexed() {
    let mut pixels = Vec::with_capacity(256 * 4);
    for i in 0..256 {
        let v = i as u8;
        pixels.extend_from_slice(&[v, v, v, 255]);
    }

    let png = create_png_auto(&pixels, 256, 1).unwrap();
    assert_eq!(color_type(&png), 3);
    assert_eq!(decode_rgba(&png).2, pixels);
}

#[test]
fn test_257_colors_falls_back_to_rgba() {
    let mut pixels = Vec::with_capacity(257 * 4);
    for i in 0..256 {
        let v = i as u8;
        pixels.extend_from_slice(&[v, v, v, 255]);
    }
    pixels.extend_from_slice(&[128, 0, 0, 255]);

    let png = create_png_auto(&pixels, 257, 1).unwrap();
    assert_eq!(color_type(&png), 6);
    assert_eq!(decode_rgba(&png).2, pixels);
}

#[test]
fn test_quantized_overlay_indexed_is_smaller() {
    let pixels = overlay_pixels(64, 64, 12);

    let indexed = create_png_auto(&pixels, 64, 64).unwrap();
    let rgba = create_png(&pixels, 64, 64).unwrap();

    assert_eq!(color_type(&indexed), 3);
    assert!(
        indexed.len() < rgba.len(),
        "Indexed PNG ({} bytes) should be smaller than RGBA ({} bytes)",
        indexed.len(),
        rgba.len()
    );
}

// ============================================================================
// Large image tests (parallel processing)
// ============================================================================

#[test]
fn test_large_image_parallel_extraction() {
    // 256x256 = 65536 pixels, well above the parallel threshold
    let pixels = overlay_pixels(256, 256, 30);

    let png = create_png_auto(&pixels, 256, 256).unwrap();
    let (w, h, decoded) = decode_rgba(&png);
    assert_eq!((w, h), (256, 256));
    assert_eq!(decoded, pixels);
}

// ============================================================================
// Edge case tests
// ============================================================================

#[test]
fn test_single_pixel() {
    let png = create_png_auto(&[255, 0, 0, 255], 1, 1).unwrap();
    assert_eq!(decode_rgba(&png).2, vec![255, 0, 0, 255]);
}

#[test]
fn test_single_color_image_is_small() {
    let pixels: Vec<u8> = std::iter::repeat([128u8, 64, 32, 255])
        .take(100 * 100)
        .flatten()
        .collect();

    let png = create_png_auto(&pixels, 100, 100).unwrap();
    assert!(png.len() < 1000, "Single color 100x100 should be very small");
}

#[test]
fn test_all_transparent() {
    let pixels = vec![0u8; 10 * 10 * 4];
    let png = create_png_auto(&pixels, 10, 10).unwrap();
    assert_eq!(decode_rgba(&png).2, pixels);
}

#[test]
fn test_wrong_buffer_length_is_error() {
    assert!(create_png_auto(&[0u8; 12], 2, 2).is_err());
    assert!(create_png(&[0u8; 20], 2, 2).is_err());
}
