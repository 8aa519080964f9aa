// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the redaction transforms in visionguard-imaging.
// Each transform runs over a 512x512 synthetic image carrying a grid of
// word-sized regions, roughly the density of a scanned lab report.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, Rgb, RgbImage};

use visionguard_core::{ImageKind, TextRegion};
use visionguard_imaging::redact;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn fixture() -> (DynamicImage, Vec<TextRegion>) {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(512, 512, Rgb([235, 235, 235])));
    let mut regions = Vec::new();
    for row in 0..16u32 {
        for col in 0..8u32 {
            if let Ok(region) = TextRegion::new(col * 64 + 4, row * 32 + 6, 48, 18, "token") {
                regions.push(region);
            }
        }
    }
    (image, regions)
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_transforms(c: &mut Criterion) {
    let (image, regions) = fixture();

    c.bench_function("outline (512x512, 128 regions)", |b| {
        b.iter(|| black_box(redact::outline(black_box(&image), black_box(&regions))));
    });

    c.bench_function("mask (512x512, 128 regions)", |b| {
        b.iter(|| black_box(redact::mask(black_box(&image), black_box(&regions))));
    });

    c.bench_function("burn raster (512x512, 128 regions)", |b| {
        b.iter(|| {
            black_box(redact::burn(
                black_box(&image),
                black_box(&regions),
                ImageKind::Raster,
            ))
        });
    });
}

/// The fallback band is the path taken on hosts without a system font.
fn bench_watermark(c: &mut Criterion) {
    let (image, _) = fixture();
    let watermark = redact::Watermark::without_font();

    c.bench_function("watermark fallback (512x512)", |b| {
        b.iter(|| black_box(watermark.stamp(black_box(&image))));
    });
}

criterion_group!(benches, bench_transforms, bench_watermark);
criterion_main!(benches);
