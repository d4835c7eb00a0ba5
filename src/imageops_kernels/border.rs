//! Border-address resolution for out-of-range sample coordinates.

use crate::error::KernelError;

/// Policy for folding an out-of-range coordinate back into `[0, n)`.
///
/// The raw codes accepted by [`BorderType::try_from`] follow OpenCV
/// (Replicate = 1, Reflect = 2, Reflect101 = 4, Default = -1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BorderType {
    /// `aaaaaa|abcdefgh|hhhhhhh`
    Replicate,
    /// `fedcba|abcdefgh|hgfedcb`
    Reflect,
    /// `gfedcb|abcdefgh|gfedcba`
    Reflect101,
    /// Same folding as [`BorderType::Reflect101`]
    #[default]
    Default,
}

impl TryFrom<i32> for BorderType {
    type Error = KernelError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Replicate),
            2 => Ok(Self::Reflect),
            4 => Ok(Self::Reflect101),
            -1 => Ok(Self::Default),
            other => Err(KernelError::InvalidBorderType(other)),
        }
    }
}

/// Maps coordinate `c` on an axis of length `len` to a valid index.
///
/// `len` must be at least 1. Coordinates any distance outside the axis fold
/// periodically, so windows wider than the image are handled. For
/// `Reflect101` on a single-sample axis the period `2 * len - 2` would be
/// zero; that case resolves to index 0.
#[inline]
#[must_use]
pub fn border_interpolate(c: isize, len: usize, border: BorderType) -> usize {
    debug_assert!(len > 0);
    let n = len as isize;
    if (0..n).contains(&c) {
        return c as usize;
    }

    match border {
        BorderType::Replicate => c.clamp(0, n - 1) as usize,
        BorderType::Reflect => {
            let r = c.rem_euclid(2 * n);
            (if r < n { r } else { 2 * n - 1 - r }) as usize
        }
        BorderType::Reflect101 | BorderType::Default => {
            if n == 1 {
                return 0;
            }
            let r = c.rem_euclid(2 * n - 2);
            (if r < n { r } else { 2 * n - 2 - r }) as usize
        }
    }
}

/// Resolves the source indices `start..start + count` along one axis.
///
/// Kernels precompute these tables once per launch instead of folding every
/// sample.
#[must_use]
pub fn border_table(start: isize, count: usize, len: usize, border: BorderType) -> Vec<usize> {
    (0..count as isize)
        .map(|i| border_interpolate(start + i, len, border))
        .collect()
}
