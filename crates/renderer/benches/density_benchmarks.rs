//! Benchmarks for the renderer crate - density building, compositing and PNG encoding.
//!
//! Run with: cargo bench --package renderer --bench density_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use heatmap_common::{aggregate, GridSpec, RenderMode};
use image::{Rgba, RgbaImage};
use renderer::{composite, density, png, RenderOptions};
use test_utils::clustered_records;

// =============================================================================
// GAUSSIAN FILTER BENCHMARKS
// =============================================================================

fn bench_gaussian_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("gaussian_filter");

    let grid = GridSpec::default();
    let records = clustered_records(5_000, 400, 1000, 42);
    let points = aggregate(&records).unwrap();
    let hist = density::histogram(&points, &grid).unwrap();

    group.throughput(Throughput::Elements((hist.width * hist.height) as u64));
    for sigma in [1.0f64, 4.0, 16.0, 32.0] {
        group.bench_with_input(BenchmarkId::new("1023x1023", sigma), &sigma, |b, &sigma| {
            b.iter(|| {
                density::gaussian_filter(black_box(&hist.counts), hist.width, hist.height, sigma)
            });
        });
    }

    group.finish();
}

// =============================================================================
// DENSITY PIPELINE BENCHMARKS
// =============================================================================

fn bench_build_density(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_density");
    let grid = GridSpec::default();

    // (records, distinct positions)
    let scenarios = [(100, 50), (10_000, 1_000), (100_000, 5_000)];

    for (count, distinct) in scenarios {
        let records = clustered_records(count, distinct, 1000, 7);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("aggregate", count), &records, |b, records| {
            b.iter(|| aggregate(black_box(records)).unwrap());
        });

        let points = aggregate(&records).unwrap();
        group.bench_with_input(BenchmarkId::new("sigma16", count), &points, |b, points| {
            b.iter(|| density::build_density(black_box(points), &grid, 16).unwrap());
        });
    }

    group.finish();
}

// =============================================================================
// FULL RENDER BENCHMARKS
// =============================================================================

fn bench_full_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_render");
    group.sample_size(10);

    let grid = GridSpec::default();
    let background = RgbaImage::from_pixel(1024, 1024, Rgba([120, 120, 120, 255]));
    let points = aggregate(&clustered_records(10_000, 1_000, 1000, 3)).unwrap();
    let opts = RenderOptions::default();

    for mode in [RenderMode::Smoothed, RenderMode::Precise] {
        group.bench_function(BenchmarkId::new("render_and_encode", mode), |b| {
            b.iter(|| {
                let img = composite::render_heatmap(
                    mode,
                    black_box(&background),
                    &points,
                    &grid,
                    16,
                    "kill",
                    &opts,
                )
                .unwrap();
                png::create_png_auto(img.as_raw(), img.width() as usize, img.height() as usize)
                    .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_gaussian_filter, bench_build_density, bench_full_render);
criterion_main!(benches);
