use crate::error::Result;
use crate::imageops_kernels::border::{border_interpolate, BorderType};
use crate::imageops_kernels::context::{rejected, Stream};
use crate::imageops_kernels::element::{validate_instantiation, Element};
use crate::imageops_kernels::view::{ImageView, ImageViewMut};
use rayon::prelude::*;

/// Two-tap interpolation entry for one destination index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LinearTap {
    /// First source index
    pub lo: usize,
    /// Second source index, `lo + 1` folded into range
    pub hi: usize,
    /// Weight of `hi`; `lo` gets `1 - weight`
    pub weight: f32,
}

/// Pixel-center aligned taps: `s = (d + 0.5) * src / dst - 0.5`.
///
/// Neighbours outside the axis are folded with replicate borders.
pub(crate) fn linear_taps(src_size: usize, dst_size: usize) -> Vec<LinearTap> {
    let scale = src_size as f64 / dst_size as f64;
    (0..dst_size)
        .map(|d| {
            let s = (d as f64 + 0.5) * scale - 0.5;
            let base = s.floor();
            let lo = base as isize;
            LinearTap {
                lo: border_interpolate(lo, src_size, BorderType::Replicate),
                hi: border_interpolate(lo + 1, src_size, BorderType::Replicate),
                weight: (s - base) as f32,
            }
        })
        .collect()
}

/// Blends rows `top` and `bottom` with the horizontal taps into `row`.
///
/// Shared with the up-scaling branch of area resize, which only differs in
/// how the taps are derived.
pub(crate) fn blend_row<T: Element, const C: usize>(
    row: &mut [T],
    top: &[T],
    bottom: &[T],
    x_taps: &[LinearTap],
    wy: f32,
) {
    for (pixel, tap) in row.chunks_exact_mut(C).zip(x_taps) {
        let (l, h) = (tap.lo * C, tap.hi * C);
        let wx = tap.weight;
        for c in 0..C {
            let upper = top[l + c].as_f32() * (1.0 - wx) + top[h + c].as_f32() * wx;
            let lower = bottom[l + c].as_f32() * (1.0 - wx) + bottom[h + c].as_f32() * wx;
            pixel[c] = T::saturate(upper * (1.0 - wy) + lower * wy);
        }
    }
}

/// Enqueues a bilinear resize of `src` into `dst`.
///
/// Samples are blended in `f32` and stored with round-to-nearest and
/// saturation for 8-bit elements.
///
/// # Errors
///
/// * `UnsupportedChannelCount` - `C` is not 1, 3 or 4
/// * `StreamTerminated` - the stream can no longer accept work
pub fn resize_linear<'scope, T, const C: usize>(
    stream: &Stream<'scope, '_>,
    src: ImageView<'scope, T, C>,
    dst: ImageViewMut<'scope, T, C>,
) -> Result<()>
where
    T: Element,
{
    validate_instantiation::<T, C>().map_err(|err| rejected("resize_linear", err))?;

    tracing::debug!(
        stream = stream.id(),
        src_height = src.height(),
        src_width = src.width(),
        dst_height = dst.height(),
        dst_width = dst.width(),
        channels = C,
        "launch resize_linear"
    );

    stream.launch("resize_linear", move || {
        let x_taps = linear_taps(src.width(), dst.width());
        let y_taps = linear_taps(src.height(), dst.height());

        dst.into_par_rows().for_each(|(dy, row)| {
            let tap = y_taps[dy];
            blend_row::<T, C>(row, src.row(tap.lo), src.row(tap.hi), &x_taps, tap.weight);
        });
    })
}
