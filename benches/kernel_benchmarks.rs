//! Performance benchmarks for imageops-kernels
//!
//! Each iteration enqueues one kernel on a fresh stream of a shared context
//! and waits for it, so the numbers include launch and synchronization.

use criterion::*;
use image::Rgb;
use imageops_kernels::{
    box_filter, norm, norm_masked, resize, BorderType, ExecutionContext, Image, ImageView,
    ImageViewMut, Interpolation, MaskView, NormType,
};
use itertools::iproduct;
use std::hint::black_box;

/// Helper function to create a test RGB image with specific dimensions
fn create_rgb_image(width: u32, height: u32) -> Image<Rgb<u8>> {
    let mut image: Image<Rgb<u8>> = Image::new(width, height);

    // Fill with realistic pattern (gradient + content)
    iproduct!(0..height, 0..width).for_each(|(y, x)| {
        let r = ((x * 255) / width) as u8;
        let g = ((y * 255) / height) as u8;
        let b = ((x + y) * 255 / (width + height)) as u8;
        image.put_pixel(x, y, Rgb([r, g, b]));
    });

    image
}

/// Checkerboard mask with 8 pixel cells
fn create_mask(width: u32, height: u32) -> Vec<u8> {
    iproduct!(0..height, 0..width)
        .map(|(y, x)| u8::from((x / 8 + y / 8) % 2 == 0))
        .collect()
}

/// Benchmark the three resize modes on a 642x480 frame
fn bench_resize_modes(c: &mut Criterion) {
    let context = ExecutionContext::new().unwrap();
    let targets = vec![
        (321, 240),  // exact half
        (500, 380),  // fractional down-scale
        (1284, 960), // double
    ];

    let image = create_rgb_image(642, 480);
    let mut group = c.benchmark_group("resize");
    group.sample_size(20);

    for ((dst_width, dst_height), interpolation) in iproduct!(
        targets,
        [
            Interpolation::Nearest,
            Interpolation::Linear,
            Interpolation::Area
        ]
    ) {
        group.throughput(Throughput::Elements((dst_width * dst_height) as u64));
        let mut dst = vec![0u8; dst_width * dst_height * 3];

        group.bench_function(
            BenchmarkId::new(
                format!("{interpolation:?}"),
                format!("642x480_to_{dst_width}x{dst_height}"),
            ),
            |b| {
                b.iter(|| {
                    context
                        .scope(|stream| {
                            let src = ImageView::<u8, 3>::try_from(&image).unwrap();
                            let dst =
                                ImageViewMut::<u8, 3>::packed(dst_height, dst_width, &mut dst)
                                    .unwrap();
                            resize(stream, src, dst, interpolation).unwrap();
                        })
                        .unwrap();
                    black_box(&dst);
                })
            },
        );
    }

    group.finish();
}

/// Benchmark box filter across window sizes and borders
fn bench_box_filter(c: &mut Criterion) {
    let context = ExecutionContext::new().unwrap();
    let sizes = vec![
        (640, 480),   // VGA
        (1920, 1080), // HD
    ];
    let kernels = vec![(3, 3), (5, 5), (31, 31)];

    let mut group = c.benchmark_group("box_filter");
    group.sample_size(10);

    for (width, height) in sizes {
        let image = create_rgb_image(width, height);
        let mut dst = vec![0u8; image.as_raw().len()];
        group.throughput(Throughput::Elements(u64::from(width * height)));

        for ((kx, ky), border) in iproduct!(
            kernels.iter().copied(),
            [BorderType::Replicate, BorderType::Reflect101]
        ) {
            group.bench_function(
                BenchmarkId::new(
                    format!("{border:?}_{kx}x{ky}"),
                    format!("{width}x{height}"),
                ),
                |b| {
                    b.iter(|| {
                        context
                            .scope(|stream| {
                                let src = ImageView::<u8, 3>::try_from(&image).unwrap();
                                let dst = ImageViewMut::<u8, 3>::packed(
                                    height as usize,
                                    width as usize,
                                    &mut dst,
                                )
                                .unwrap();
                                box_filter(stream, src, dst, kx, ky, border, true).unwrap();
                            })
                            .unwrap();
                        black_box(&dst);
                    })
                },
            );
        }
    }

    group.finish();
}

/// Benchmark the two-phase norm reduction with and without a mask
fn bench_norm(c: &mut Criterion) {
    let context = ExecutionContext::new().unwrap();
    let sizes = vec![(640, 480), (1920, 1080)];

    let mut group = c.benchmark_group("norm");
    group.sample_size(20);

    for (width, height) in sizes {
        let image = create_rgb_image(width, height);
        let mask = create_mask(width, height);
        group.throughput(Throughput::Elements(u64::from(width * height)));

        for norm_type in [NormType::Inf, NormType::L1, NormType::L2] {
            group.bench_function(
                BenchmarkId::new(format!("{norm_type:?}"), format!("{width}x{height}")),
                |b| {
                    b.iter(|| {
                        let mut value = 0.0;
                        context
                            .scope(|stream| {
                                let src = ImageView::<u8, 3>::try_from(&image).unwrap();
                                norm(stream, src, norm_type, &mut value).unwrap();
                            })
                            .unwrap();
                        black_box(value)
                    })
                },
            );

            group.bench_function(
                BenchmarkId::new(format!("{norm_type:?}_masked"), format!("{width}x{height}")),
                |b| {
                    b.iter(|| {
                        let mut value = 0.0;
                        context
                            .scope(|stream| {
                                let src = ImageView::<u8, 3>::try_from(&image).unwrap();
                                let mask =
                                    MaskView::packed(height as usize, width as usize, &mask)
                                        .unwrap();
                                norm_masked(stream, src, mask, norm_type, &mut value).unwrap();
                            })
                            .unwrap();
                        black_box(value)
                    })
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_resize_modes, bench_box_filter, bench_norm);
criterion_main!(benches);
