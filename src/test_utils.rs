//! Test utilities for imageops-kernels
//!
//! Fixed fixtures and naive sequential references the data-parallel kernels
//! are checked against. Only compiled when running tests.

use image::{Rgb, Rgba};
use itertools::iproduct;
use proptest::prelude::Rng;
use proptest::test_runner::{RngAlgorithm, TestRng};

use crate::imageops_kernels::border::{border_interpolate, BorderType};
use crate::imageops_kernels::element::Element;
use crate::imageops_kernels::view::ImageView;
use crate::Image;

/// Creates a 2x2 RGB image with known pixel values:
/// - (0,0): [200, 150, 100]
/// - (1,0): [100, 200, 150]
/// - (0,1): [150, 100, 200]
/// - (1,1): [50, 75, 25]
pub fn create_test_rgb_image() -> Image<Rgb<u8>> {
    let mut image: Image<Rgb<u8>> = Image::new(2, 2);
    image.put_pixel(0, 0, Rgb([200, 150, 100]));
    image.put_pixel(1, 0, Rgb([100, 200, 150]));
    image.put_pixel(0, 1, Rgb([150, 100, 200]));
    image.put_pixel(1, 1, Rgb([50, 75, 25]));
    image
}

/// Creates a 2x2 RGBA image; alpha runs 255, 128, 64, 0 in row-major order.
pub fn create_test_rgba_image() -> Image<Rgba<u8>> {
    let mut image: Image<Rgba<u8>> = Image::new(2, 2);
    image.put_pixel(0, 0, Rgba([200, 150, 100, 255]));
    image.put_pixel(1, 0, Rgba([100, 200, 150, 128]));
    image.put_pixel(0, 1, Rgba([150, 100, 200, 64]));
    image.put_pixel(1, 1, Rgba([50, 75, 25, 0]));
    image
}

fn seeded_rng(seed: u32) -> TestRng {
    let seed: Vec<u8> = seed.to_le_bytes().iter().copied().cycle().take(32).collect();
    TestRng::from_seed(RngAlgorithm::ChaCha, &seed)
}

/// Deterministic pseudo-random packed buffer of `height * width * channels`
/// bytes.
pub fn noise_u8(height: usize, width: usize, channels: usize, seed: u32) -> Vec<u8> {
    let mut data = vec![0u8; height * width * channels];
    seeded_rng(seed).fill_bytes(&mut data);
    data
}

/// Deterministic samples in `[-scale, scale]`, packed like [`noise_u8`].
pub fn noise_f32(
    height: usize,
    width: usize,
    channels: usize,
    seed: u32,
    scale: f32,
) -> Vec<f32> {
    let mut rng = seeded_rng(seed);
    (0..height * width * channels)
        .map(|_| (rng.next_u32() as f32 / u32::MAX as f32 * 2.0 - 1.0) * scale)
        .collect()
}

/// Direct 2D window sum, one sample at a time.
pub fn reference_box_filter<T: Element, const C: usize>(
    src: ImageView<'_, T, C>,
    ksize_x: usize,
    ksize_y: usize,
    border: BorderType,
    normalize: bool,
) -> Vec<T> {
    let (height, width) = src.dimensions();
    let mut out = Vec::with_capacity(height * width * C);
    for y in 0..height {
        for x in 0..width {
            for c in 0..C {
                let mut sum = 0.0f64;
                for (wy, wx) in iproduct!(0..ksize_y, 0..ksize_x) {
                    let sy = border_interpolate(
                        (y + wy) as isize - (ksize_y / 2) as isize,
                        height,
                        border,
                    );
                    let sx = border_interpolate(
                        (x + wx) as isize - (ksize_x / 2) as isize,
                        width,
                        border,
                    );
                    sum += src.pixel(sy, sx)[c].as_f64();
                }
                if normalize {
                    sum *= 1.0 / (ksize_x * ksize_y) as f64;
                }
                out.push(T::saturate_f64(sum));
            }
        }
    }
    out
}

/// Largest absolute difference between two equally long buffers.
pub fn max_abs_diff<T: Element>(expected: &[T], actual: &[T]) -> f64 {
    assert_eq!(expected.len(), actual.len());
    expected
        .iter()
        .zip(actual)
        .map(|(e, a)| (e.as_f64() - a.as_f64()).abs())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noise_u8_is_deterministic() {
        assert_eq!(noise_u8(4, 4, 3, 7), noise_u8(4, 4, 3, 7));
        assert_ne!(noise_u8(4, 4, 3, 7), noise_u8(4, 4, 3, 8));
        assert_eq!(noise_u8(3, 5, 4, 1).len(), 60);
    }

    #[test]
    fn noise_f32_stays_in_range() {
        let data = noise_f32(8, 8, 3, 3, 50.0);
        assert_eq!(data, noise_f32(8, 8, 3, 3, 50.0));
        assert!(data.iter().all(|v| (-50.0..=50.0).contains(v)));
        assert!(data.iter().any(|&v| v < 0.0) && data.iter().any(|&v| v > 0.0));
    }

    #[test]
    fn reference_box_filter_on_single_row() {
        let data = [0u8, 30, 60];
        let view = ImageView::<u8, 1>::packed(1, 3, &data).unwrap();
        assert_eq!(
            reference_box_filter(view, 3, 1, BorderType::Reflect101, false),
            vec![60, 90, 120]
        );
    }

    #[test]
    fn max_abs_diff_finds_largest_gap() {
        assert_eq!(max_abs_diff(&[1.0f32, 5.0], &[1.5, 2.0]), 3.0);
    }
}
