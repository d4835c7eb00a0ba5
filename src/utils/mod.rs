//! Internal utility functions for imageops-kernels.
//!
//! Validation shared by every kernel entry point lives here so that all
//! launches reject bad geometry the same way, before anything is enqueued.

use image::Primitive;
use imageproc::definitions::Clamp;

use crate::error::{KernelError, Result};

/// Channel counts kernels are instantiated for.
pub const SUPPORTED_CHANNELS: [usize; 3] = [1, 3, 4];

/// Clamps a floating-point value to the range of a primitive type.
///
/// # Arguments
///
/// * `value` - The floating-point value to clamp
///
/// # Returns
///
/// The clamped value as the target primitive type
#[inline]
pub fn clamp_f32_to_primitive<T: Primitive + Clamp<f32>>(value: f32) -> T {
    T::clamp(value)
}

/// Validates that an image has non-zero dimensions.
pub fn validate_dimensions(height: usize, width: usize) -> Result<()> {
    if height == 0 || width == 0 {
        Err(KernelError::InvalidDimension { height, width })
    } else {
        Ok(())
    }
}

/// Validates the geometry of a strided buffer.
///
/// Checks, in order: non-zero dimensions, `stride >= width * channels`, a
/// non-empty buffer, and a buffer long enough for the last row.
///
/// # Arguments
///
/// * `height` - Rows of the image
/// * `width` - Columns of the image
/// * `channels` - Interleaved channels per pixel
/// * `stride` - Elements between the starts of consecutive rows
/// * `len` - Length of the backing buffer in elements
pub fn validate_strided_buffer(
    height: usize,
    width: usize,
    channels: usize,
    stride: usize,
    len: usize,
) -> Result<()> {
    validate_dimensions(height, width)?;

    let minimum = width
        .checked_mul(channels)
        .ok_or(KernelError::InvalidDimension { height, width })?;
    if stride < minimum {
        return Err(KernelError::InvalidStride { stride, minimum });
    }

    if len == 0 {
        return Err(KernelError::NullPointer);
    }

    let required = (height - 1)
        .checked_mul(stride)
        .and_then(|rows| rows.checked_add(minimum))
        .ok_or(KernelError::BufferTooSmall {
            required: usize::MAX,
            actual: len,
        })?;
    if len < required {
        return Err(KernelError::BufferTooSmall {
            required,
            actual: len,
        });
    }

    Ok(())
}

/// Validates that a channel count is one kernels are instantiated for.
pub fn validate_channels(channels: usize) -> Result<()> {
    if SUPPORTED_CHANNELS.contains(&channels) {
        Ok(())
    } else {
        Err(KernelError::UnsupportedChannelCount(channels))
    }
}

/// Validates that two images have matching spatial dimensions.
pub fn validate_matching_dimensions(
    expected: (usize, usize),
    actual: (usize, usize),
) -> Result<()> {
    if expected.0 != actual.0 || expected.1 != actual.1 {
        Err(KernelError::DimensionMismatch { expected, actual })
    } else {
        Ok(())
    }
}
