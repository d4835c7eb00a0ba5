use std::ops::Range;

use crate::error::{KernelError, Result};
use crate::imageops_kernels::border::{border_table, BorderType};
use crate::imageops_kernels::context::{rejected, Stream};
use crate::imageops_kernels::element::{validate_instantiation, Element};
use crate::imageops_kernels::view::{ImageView, ImageViewMut};
use crate::utils::validate_matching_dimensions;
use rayon::prelude::*;

/// Parameters of a box filter launch.
///
/// The window is `ksize_y` rows by `ksize_x` columns with its anchor at
/// `(ksize_y / 2, ksize_x / 2)`, so even sizes extend one sample further
/// before the anchor than after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxFilter {
    ksize_x: usize,
    ksize_y: usize,
    normalize: bool,
    border: BorderType,
}

impl BoxFilter {
    /// Creates a normalized box filter with the default border.
    ///
    /// Any non-zero size is accepted, including windows far larger than the
    /// image.
    ///
    /// # Errors
    ///
    /// * `InvalidKernelSize` - either size is zero
    pub fn new(ksize_x: usize, ksize_y: usize) -> Result<Self> {
        if ksize_x == 0 || ksize_y == 0 {
            return Err(KernelError::InvalidKernelSize { ksize_x, ksize_y });
        }
        Ok(Self {
            ksize_x,
            ksize_y,
            normalize: true,
            border: BorderType::Default,
        })
    }

    #[must_use]
    pub const fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    #[must_use]
    pub const fn with_border(mut self, border: BorderType) -> Self {
        self.border = border;
        self
    }

    #[must_use]
    pub const fn ksize(&self) -> (usize, usize) {
        (self.ksize_x, self.ksize_y)
    }

    #[must_use]
    pub const fn normalize(&self) -> bool {
        self.normalize
    }

    #[must_use]
    pub const fn border(&self) -> BorderType {
        self.border
    }

    /// Window offset before the anchor along (y, x)
    const fn anchor(&self) -> (usize, usize) {
        (self.ksize_y / 2, self.ksize_x / 2)
    }

    /// Enqueues the filter of `src` into `dst`.
    ///
    /// The filter is separable: each source row is summed over the
    /// horizontal window into a double precision buffer, then those row sums
    /// are added down each vertical window. Every window is summed directly,
    /// so a large or non-finite sample only affects the outputs whose window
    /// covers it.
    ///
    /// # Errors
    ///
    /// * `DimensionMismatch` - `dst` is not the size of `src`
    /// * `UnsupportedChannelCount` - `C` is not 1, 3 or 4
    /// * `StreamTerminated` - the stream can no longer accept work
    pub fn enqueue<'scope, T, const C: usize>(
        &self,
        stream: &Stream<'scope, '_>,
        src: ImageView<'scope, T, C>,
        dst: ImageViewMut<'scope, T, C>,
    ) -> Result<()>
    where
        T: Element,
    {
        validate_instantiation::<T, C>()
            .and_then(|()| validate_matching_dimensions(src.dimensions(), dst.dimensions()))
            .map_err(|err| rejected("box_filter", err))?;

        tracing::debug!(
            stream = stream.id(),
            height = src.height(),
            width = src.width(),
            channels = C,
            ksize_x = self.ksize_x,
            ksize_y = self.ksize_y,
            normalize = self.normalize,
            border = ?self.border,
            "launch box_filter"
        );

        let filter = *self;
        stream.launch("box_filter", move || filter.run(src, dst))
    }

    fn run<T: Element, const C: usize>(self, src: ImageView<'_, T, C>, dst: ImageViewMut<'_, T, C>) {
        let (height, width) = src.dimensions();
        let (anchor_y, anchor_x) = self.anchor();
        let x_axis = WindowAxis::new(width, self.ksize_x, anchor_x, self.border);
        let y_axis = WindowAxis::new(height, self.ksize_y, anchor_y, self.border);

        let row_len = width * C;
        let row_sums = horizontal_sums(src, &x_axis);
        let row = |y: usize| &row_sums[y * row_len..(y + 1) * row_len];

        let mut period_row = vec![0.0f64; row_len];
        for &sy in y_axis.period_indices() {
            add_repeated(&mut period_row, 1, row(sy));
        }
        let scale = 1.0 / (self.ksize_x as f64 * self.ksize_y as f64);

        dst.into_par_rows().for_each_init(
            || vec![0.0f64; row_len],
            |acc, (y, out)| {
                let window = y_axis.fold(y);
                acc.fill(0.0);
                for &sy in &y_axis.index[window.run] {
                    add_repeated(acc, 1, row(sy));
                }
                add_repeated(acc, window.head, row(0));
                add_repeated(acc, window.tail, row(height - 1));
                add_repeated(acc, window.periods, &period_row);

                for (out, &sum) in out.iter_mut().zip(acc.iter()) {
                    *out = if self.normalize {
                        T::saturate_f64(sum * scale)
                    } else {
                        T::saturate_f64(sum)
                    };
                }
            },
        );
    }
}

/// One axis window split into copies of the edge samples, whole border
/// periods and a run of resolved indices.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FoldedWindow {
    /// Copies of the first sample
    head: usize,
    /// Copies of the last sample
    tail: usize,
    /// Whole border periods
    periods: usize,
    /// Positions into [`WindowAxis::index`]
    run: Range<usize>,
}

/// Window placement along one axis.
///
/// Replicate borders, and any border on a single-sample axis, extend the
/// edge samples, so the part of a window outside the image is a count of
/// edge copies. The reflecting borders are periodic, so a window is a number
/// of whole periods plus a remainder shorter than one period. Either way the
/// work per window is bounded by the axis length, whatever the window size.
#[derive(Debug)]
struct WindowAxis {
    len: usize,
    ksize: usize,
    anchor: usize,
    /// `None` when edges are replicated
    period: Option<usize>,
    index: Vec<usize>,
}

impl WindowAxis {
    fn new(len: usize, ksize: usize, anchor: usize, border: BorderType) -> Self {
        let period = match border {
            _ if len == 1 => None,
            BorderType::Replicate => None,
            BorderType::Reflect => Some(2 * len),
            BorderType::Reflect101 | BorderType::Default => Some(2 * len - 2),
        };
        let index = match period {
            Some(period) => border_table(0, 2 * period, len, border),
            None => (0..len).collect(),
        };
        Self {
            len,
            ksize,
            anchor,
            period,
            index,
        }
    }

    /// Resolved indices of one whole period, empty when edges are replicated
    fn period_indices(&self) -> &[usize] {
        self.period.map_or(&[], |period| &self.index[..period])
    }

    fn fold(&self, pos: usize) -> FoldedWindow {
        let start = pos as i128 - self.anchor as i128;
        let ksize = self.ksize as i128;

        match self.period {
            Some(period) => {
                let period = period as i128;
                let first = start.rem_euclid(period) as usize;
                FoldedWindow {
                    head: 0,
                    tail: 0,
                    periods: (ksize / period) as usize,
                    run: first..first + (ksize % period) as usize,
                }
            }
            None => {
                let len = self.len as i128;
                let end = start + ksize;
                let first = start.clamp(0, len);
                let last = end.clamp(first, len);
                FoldedWindow {
                    head: (-start).clamp(0, ksize) as usize,
                    tail: (end - len).clamp(0, ksize) as usize,
                    periods: 0,
                    run: first as usize..last as usize,
                }
            }
        }
    }
}

/// Horizontal window sums of every source row, packed `height x width x C`.
fn horizontal_sums<T: Element, const C: usize>(
    src: ImageView<'_, T, C>,
    axis: &WindowAxis,
) -> Vec<f64> {
    let row_len = src.width() * C;
    let last = (src.width() - 1) * C;
    let mut sums = vec![0.0f64; src.height() * row_len];

    sums.par_chunks_mut(row_len).enumerate().for_each(|(y, out)| {
        let row = src.row(y);
        let mut period_sum = [0.0f64; C];
        for &sx in axis.period_indices() {
            for (sum, v) in period_sum.iter_mut().zip(&row[sx * C..(sx + 1) * C]) {
                *sum += v.as_f64();
            }
        }

        for (x, pixel) in out.chunks_exact_mut(C).enumerate() {
            let window = axis.fold(x);
            for (c, sum) in pixel.iter_mut().enumerate() {
                let run = axis.index[window.run.clone()]
                    .iter()
                    .fold(T::Sum::default(), |acc, &sx| acc + row[sx * C + c].widen());
                *sum = T::sum_to_f64(run)
                    + repeated(window.head, row[c].as_f64())
                    + repeated(window.tail, row[last + c].as_f64())
                    + repeated(window.periods, period_sum[c]);
            }
        }
    });
    sums
}

/// `count` copies of `value`; no copies add nothing, even for non-finite values
fn repeated(count: usize, value: f64) -> f64 {
    if count == 0 {
        0.0
    } else {
        count as f64 * value
    }
}

fn add_repeated(acc: &mut [f64], count: usize, values: &[f64]) {
    if count == 0 {
        return;
    }
    let count = count as f64;
    for (acc, &v) in acc.iter_mut().zip(values) {
        *acc += count * v;
    }
}

/// Enqueues a `ksize_y x ksize_x` box filter of `src` into `dst`.
///
/// Out-of-range window samples are resolved with `border`. With `normalize`
/// the window sum is divided by `ksize_x * ksize_y`; otherwise the raw sum
/// is stored, saturated for 8-bit elements.
///
/// # Errors
///
/// * `InvalidKernelSize` - either size is zero
/// * `DimensionMismatch` - `dst` is not the size of `src`
/// * `UnsupportedChannelCount` - `C` is not 1, 3 or 4
/// * `StreamTerminated` - the stream can no longer accept work
pub fn box_filter<'scope, T, const C: usize>(
    stream: &Stream<'scope, '_>,
    src: ImageView<'scope, T, C>,
    dst: ImageViewMut<'scope, T, C>,
    ksize_x: usize,
    ksize_y: usize,
    border: BorderType,
    normalize: bool,
) -> Result<()>
where
    T: Element,
{
    BoxFilter::new(ksize_x, ksize_y)
        .map_err(|err| rejected("box_filter", err))?
        .with_border(border)
        .with_normalize(normalize)
        .enqueue(stream, src, dst)
}
