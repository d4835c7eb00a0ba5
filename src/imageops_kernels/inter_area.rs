use std::ops::Range;

use itertools::iproduct;
use rayon::prelude::*;

use crate::error::Result;
use crate::imageops_kernels::context::{rejected, Stream};
use crate::imageops_kernels::element::{validate_instantiation, Element};
use crate::imageops_kernels::resize_linear::{blend_row, LinearTap};
use crate::imageops_kernels::view::{ImageView, ImageViewMut};

/// Element of the weight table for area interpolation.
#[derive(Debug, Clone, Copy, PartialEq)]
struct InterpolationWeight {
    destination_index: usize,
    source_index: usize,
    weight: f32,
}

/// How an area resize is carried out for a given geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaRegime {
    /// Both axes shrink by an integer factor: disjoint block means
    IntegerScale { scale_x: usize, scale_y: usize },
    /// Both axes shrink: overlap-weighted decimation tables
    FractionalScale,
    /// At least one axis grows: two-tap area-linear weights
    Upscale,
}

impl AreaRegime {
    /// Picks the regime for a `src -> dst` geometry given as (height, width).
    #[must_use]
    pub fn select(src: (usize, usize), dst: (usize, usize)) -> Self {
        let (src_height, src_width) = src;
        let (dst_height, dst_width) = dst;
        if dst_width > src_width || dst_height > src_height {
            return Self::Upscale;
        }
        if can_use_integer_scale(src_width, dst_width)
            && can_use_integer_scale(src_height, dst_height)
        {
            Self::IntegerScale {
                scale_x: src_width / dst_width,
                scale_y: src_height / dst_height,
            }
        } else {
            Self::FractionalScale
        }
    }
}

/// Check if we can use the integer scale optimization.
fn can_use_integer_scale(src_size: usize, dst_size: usize) -> bool {
    dst_size <= src_size && src_size % dst_size == 0
}

/// Compute resize area decimation table.
///
/// Each destination cell `[d * scale, (d + 1) * scale)` is intersected with
/// the unit source cells. Cells are clipped at the image end and the weights
/// divided by the covered width, so every destination index sums to 1.
fn compute_interpolation_weights(
    src_size: usize,
    dst_size: usize,
    scale: f64,
) -> Vec<InterpolationWeight> {
    let mut tab = Vec::with_capacity(src_size * 2);
    let src_len = src_size as f64;

    for dx in 0..dst_size {
        let src_x_start = dx as f64 * scale;
        let src_x_end = src_x_start + scale;
        let cell_width = scale.min(src_len - src_x_start);

        let end_int = (src_x_end.floor() as usize).min(src_size - 1);
        let start_int = (src_x_start.ceil() as usize).min(end_int);

        // Left partial overlap
        if start_int as f64 - src_x_start > 1e-3 {
            tab.push(InterpolationWeight {
                destination_index: dx,
                source_index: start_int - 1,
                weight: ((start_int as f64 - src_x_start) / cell_width) as f32,
            });
        }

        // Full overlaps
        for sx in start_int..end_int {
            tab.push(InterpolationWeight {
                destination_index: dx,
                source_index: sx,
                weight: (1.0 / cell_width) as f32,
            });
        }

        // Right partial overlap
        if src_x_end - end_int as f64 > 1e-3 {
            let overlap = (src_x_end - end_int as f64).min(1.0).min(cell_width);
            tab.push(InterpolationWeight {
                destination_index: dx,
                source_index: end_int,
                weight: (overlap / cell_width) as f32,
            });
        }
    }

    tab
}

/// Ranges of `tab` belonging to each destination index.
fn destination_ranges(tab: &[InterpolationWeight], dst_size: usize) -> Vec<Range<usize>> {
    let mut ranges = vec![0..0; dst_size];
    let mut start = 0;
    for (i, entry) in tab.iter().enumerate() {
        let next = tab.get(i + 1).map(|e| e.destination_index);
        if next != Some(entry.destination_index) {
            ranges[entry.destination_index] = start..i + 1;
            start = i + 1;
        }
    }
    ranges
}

/// Area-linear taps used when an axis grows.
///
/// `f = (d + 1) - (s + 1) / scale` with `s = floor(d * scale)`, folded into
/// `[0, 1)`; the last source sample is clamped with zero weight.
fn area_upscale_taps(src_size: usize, dst_size: usize) -> Vec<LinearTap> {
    let scale = src_size as f64 / dst_size as f64;
    let inv_scale = dst_size as f64 / src_size as f64;
    (0..dst_size)
        .map(|d| {
            let s = (d as f64 * scale).floor() as usize;
            let f = ((d + 1) as f64 - (s + 1) as f64 * inv_scale) as f32;
            let f = if f <= 0.0 { 0.0 } else { f - f.floor() };
            if s >= src_size - 1 {
                LinearTap {
                    lo: src_size - 1,
                    hi: src_size - 1,
                    weight: 0.0,
                }
            } else {
                LinearTap {
                    lo: s,
                    hi: s + 1,
                    weight: f,
                }
            }
        })
        .collect()
}

/// Integer scale implementation: mean of each disjoint block.
fn resize_area_integer_scale<T: Element, const C: usize>(
    src: ImageView<'_, T, C>,
    dst: ImageViewMut<'_, T, C>,
    scale_x: usize,
    scale_y: usize,
) {
    let inv_area = 1.0 / (scale_x * scale_y) as f32;

    dst.into_par_rows().for_each(|(dy, row)| {
        let start_y = dy * scale_y;
        for (dx, pixel) in row.chunks_exact_mut(C).enumerate() {
            let mut pixel_sum = [0.0f32; C];
            let start_x = dx * scale_x;
            for (sy, sx) in iproduct!(start_y..start_y + scale_y, start_x..start_x + scale_x) {
                let source = src.pixel(sy, sx);
                for c in 0..C {
                    pixel_sum[c] += source[c].as_f32();
                }
            }
            for c in 0..C {
                pixel[c] = T::saturate(pixel_sum[c] * inv_area);
            }
        }
    });
}

/// Fractional scale implementation for arbitrary down-scale factors.
fn resize_area_fractional_scale<T: Element, const C: usize>(
    src: ImageView<'_, T, C>,
    dst: ImageViewMut<'_, T, C>,
) {
    let (src_height, src_width) = src.dimensions();
    let (dst_height, dst_width) = dst.dimensions();
    let scale_x = src_width as f64 / dst_width as f64;
    let scale_y = src_height as f64 / dst_height as f64;

    // Compute X and Y tables
    let x_weights = compute_interpolation_weights(src_width, dst_width, scale_x);
    let y_weights = compute_interpolation_weights(src_height, dst_height, scale_y);
    let y_ranges = destination_ranges(&y_weights, dst_height);
    let row_len = dst_width * C;

    dst.into_par_rows().for_each_init(
        || (vec![0.0f32; row_len], vec![0.0f32; row_len]),
        |(buf, sum), (dy, row)| {
            sum.fill(0.0);

            for y_entry in &y_weights[y_ranges[dy].clone()] {
                let src_row = src.row(y_entry.source_index);
                let beta = y_entry.weight;

                // Horizontal pass
                buf.fill(0.0);
                for x_entry in &x_weights {
                    let s = x_entry.source_index * C;
                    let d = x_entry.destination_index * C;
                    for c in 0..C {
                        buf[d + c] += src_row[s + c].as_f32() * x_entry.weight;
                    }
                }

                // Vertical accumulation
                for (acc, value) in sum.iter_mut().zip(buf.iter()) {
                    *acc += value * beta;
                }
            }

            for (out, value) in row.iter_mut().zip(sum.iter()) {
                *out = T::saturate(*value);
            }
        },
    );
}

/// Up-scale implementation: two-tap blend with area-linear weights.
fn resize_area_upscale<T: Element, const C: usize>(
    src: ImageView<'_, T, C>,
    dst: ImageViewMut<'_, T, C>,
) {
    let x_taps = area_upscale_taps(src.width(), dst.width());
    let y_taps = area_upscale_taps(src.height(), dst.height());

    dst.into_par_rows().for_each(|(dy, row)| {
        let tap = y_taps[dy];
        blend_row::<T, C>(row, src.row(tap.lo), src.row(tap.hi), &x_taps, tap.weight);
    });
}

/// Enqueues an area-weighted (`INTER_AREA`) resize of `src` into `dst`.
///
/// Down-scaling averages every source pixel covered by a destination cell,
/// weighted by overlap. Integer factors take the block-mean fast path. When
/// either axis grows, the area-linear two-tap weighting is used instead so
/// cells covering less than one source pixel never divide by a vanishing
/// area.
///
/// # Errors
///
/// * `UnsupportedChannelCount` - `C` is not 1, 3 or 4
/// * `StreamTerminated` - the stream can no longer accept work
pub fn resize_area<'scope, T, const C: usize>(
    stream: &Stream<'scope, '_>,
    src: ImageView<'scope, T, C>,
    dst: ImageViewMut<'scope, T, C>,
) -> Result<()>
where
    T: Element,
{
    validate_instantiation::<T, C>().map_err(|err| rejected("resize_area", err))?;

    let regime = AreaRegime::select(src.dimensions(), dst.dimensions());
    tracing::debug!(
        stream = stream.id(),
        src_height = src.height(),
        src_width = src.width(),
        dst_height = dst.height(),
        dst_width = dst.width(),
        channels = C,
        regime = ?regime,
        "launch resize_area"
    );

    stream.launch("resize_area", move || match regime {
        AreaRegime::IntegerScale { scale_x, scale_y } => {
            resize_area_integer_scale(src, dst, scale_x, scale_y);
        }
        AreaRegime::FractionalScale => resize_area_fractional_scale(src, dst),
        AreaRegime::Upscale => resize_area_upscale(src, dst),
    })
}
