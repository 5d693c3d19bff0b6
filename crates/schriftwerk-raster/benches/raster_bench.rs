// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the raster stages: grid rectification on a small
// synthetic scan, and cell segmentation of a canonical frame.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{GrayImage, Luma};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use schriftwerk_core::types::GridTemplate;
use schriftwerk_raster::{CellSegmenter, GridRectifier};

/// A small scan with a dark grid rectangle in canonical proportions.
fn synthetic_scan() -> GrayImage {
    let mut img = GrayImage::from_pixel(750, 550, Luma([255u8]));
    for inset in 0..3i32 {
        draw_hollow_rect_mut(
            &mut img,
            Rect::at(75 + inset, 55 + inset).of_size(600 - 2 * inset as u32, 440 - 2 * inset as u32),
            Luma([0u8]),
        );
    }
    img
}

fn bench_rectify(c: &mut Criterion) {
    let scan = synthetic_scan();
    let rectifier = GridRectifier::new(750, 550);

    c.bench_function("rectify (750x550)", |b| {
        b.iter(|| {
            let (frame, _) = rectifier.rectify(black_box(&scan));
            black_box(frame);
        });
    });
}

fn bench_segment(c: &mut Criterion) {
    let frame = GrayImage::from_pixel(2250, 1650, Luma([255u8]));
    let segmenter = CellSegmenter::new(GridTemplate::standard(), 0.10, 0);

    c.bench_function("segment (2250x1650, 62 cells)", |b| {
        b.iter(|| {
            black_box(segmenter.segment(black_box(&frame)));
        });
    });
}

criterion_group!(benches, bench_rectify, bench_segment);
criterion_main!(benches);
