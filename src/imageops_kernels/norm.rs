//! Global L1 / L2 / Inf norms with an optional mask.
//!
//! The reduction runs in two phases: row groups are accumulated into
//! independent partials in parallel, then the partials are combined in group
//! order on a single worker.

use rayon::prelude::*;

use crate::error::{KernelError, Result};
use crate::imageops_kernels::context::{rejected, Stream};
use crate::imageops_kernels::element::{validate_instantiation, Element};
use crate::imageops_kernels::view::{ImageView, MaskView};
use crate::utils::validate_matching_dimensions;

/// Norm selector.
///
/// The raw codes accepted by [`NormType::try_from`] follow OpenCV
/// (Inf = 1, L1 = 2, L2 = 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NormType {
    /// Maximum absolute value
    Inf,
    /// Sum of absolute values
    L1,
    /// Square root of the sum of squares
    L2,
}

impl TryFrom<i32> for NormType {
    type Error = KernelError;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            1 => Ok(Self::Inf),
            2 => Ok(Self::L1),
            4 => Ok(Self::L2),
            other => Err(KernelError::InvalidNormKind(other)),
        }
    }
}

impl From<NormType> for i32 {
    fn from(norm_type: NormType) -> Self {
        match norm_type {
            NormType::Inf => 1,
            NormType::L1 => 2,
            NormType::L2 => 4,
        }
    }
}

/// Partial result of one reduction group.
trait Accumulator: Default + Copy + Send {
    fn accumulate(&mut self, value: f64);

    fn combine(self, other: Self) -> Self;

    fn finish(self) -> f64;
}

#[derive(Debug, Default, Clone, Copy)]
struct MaxAbs(f64);

impl Accumulator for MaxAbs {
    #[inline]
    fn accumulate(&mut self, value: f64) {
        self.0 = self.0.max(value.abs());
    }

    fn combine(self, other: Self) -> Self {
        Self(self.0.max(other.0))
    }

    fn finish(self) -> f64 {
        self.0
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct SumAbs(f64);

impl Accumulator for SumAbs {
    #[inline]
    fn accumulate(&mut self, value: f64) {
        self.0 += value.abs();
    }

    fn combine(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }

    fn finish(self) -> f64 {
        self.0
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct SumSquares(f64);

impl Accumulator for SumSquares {
    #[inline]
    fn accumulate(&mut self, value: f64) {
        self.0 += value * value;
    }

    fn combine(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }

    fn finish(self) -> f64 {
        self.0.sqrt()
    }
}

/// Accumulates rows `rows` of `src`, skipping pixels whose mask is zero.
fn accumulate_rows<A, T, const C: usize>(
    src: ImageView<'_, T, C>,
    mask: Option<MaskView<'_>>,
    rows: std::ops::Range<usize>,
) -> A
where
    A: Accumulator,
    T: Element,
{
    let mut acc = A::default();
    for y in rows {
        let row = src.row(y);
        match mask {
            None => row.iter().for_each(|v| acc.accumulate(v.as_f64())),
            Some(mask) => {
                for (pixel, &selected) in row.chunks_exact(C).zip(mask.row(y)) {
                    if selected != 0 {
                        pixel.iter().for_each(|v| acc.accumulate(v.as_f64()));
                    }
                }
            }
        }
    }
    acc
}

fn reduce<A, T, const C: usize>(
    src: ImageView<'_, T, C>,
    mask: Option<MaskView<'_>>,
    partial_groups: usize,
) -> f64
where
    A: Accumulator,
    T: Element,
{
    let height = src.height();
    let groups = partial_groups.min(height);
    let rows_per_group = height.div_ceil(groups);

    // Phase 1
    let partials: Vec<A> = (0..groups)
        .into_par_iter()
        .map(|group| {
            let start = (group * rows_per_group).min(height);
            let end = (start + rows_per_group).min(height);
            accumulate_rows::<A, T, C>(src, mask, start..end)
        })
        .collect();

    // Phase 2
    partials
        .into_iter()
        .fold(A::default(), Accumulator::combine)
        .finish()
}

pub(crate) fn compute_norm<T: Element, const C: usize>(
    src: ImageView<'_, T, C>,
    mask: Option<MaskView<'_>>,
    norm_type: NormType,
    partial_groups: usize,
) -> f64 {
    match norm_type {
        NormType::Inf => reduce::<MaxAbs, T, C>(src, mask, partial_groups),
        NormType::L1 => reduce::<SumAbs, T, C>(src, mask, partial_groups),
        NormType::L2 => reduce::<SumSquares, T, C>(src, mask, partial_groups),
    }
}

fn enqueue_norm<'scope, T, const C: usize>(
    stream: &Stream<'scope, '_>,
    src: ImageView<'scope, T, C>,
    mask: Option<MaskView<'scope>>,
    norm_type: NormType,
    out: &'scope mut f64,
) -> Result<()>
where
    T: Element,
{
    let kernel = if mask.is_some() { "norm_masked" } else { "norm" };
    validate_instantiation::<T, C>()
        .and_then(|()| match mask {
            Some(mask) => validate_matching_dimensions(src.dimensions(), mask.dimensions()),
            None => Ok(()),
        })
        .map_err(|err| rejected(kernel, err))?;

    tracing::debug!(
        stream = stream.id(),
        height = src.height(),
        width = src.width(),
        channels = C,
        norm_type = ?norm_type,
        masked = mask.is_some(),
        "launch {kernel}"
    );

    let partial_groups = stream.partial_groups();
    stream.launch(kernel, move || {
        *out = compute_norm(src, mask, norm_type, partial_groups);
    })
}

/// Enqueues the norm of every element of `src` and writes it to `out`.
///
/// `out` is valid once the stream has been synchronized or the scope has
/// returned.
///
/// # Errors
///
/// * `UnsupportedChannelCount` - `C` is not 1, 3 or 4
/// * `StreamTerminated` - the stream can no longer accept work
pub fn norm<'scope, T, const C: usize>(
    stream: &Stream<'scope, '_>,
    src: ImageView<'scope, T, C>,
    norm_type: NormType,
    out: &'scope mut f64,
) -> Result<()>
where
    T: Element,
{
    enqueue_norm(stream, src, None, norm_type, out)
}

/// Enqueues the norm over the pixels of `src` whose `mask` entry is nonzero.
///
/// All channels of a selected pixel contribute. An all-zero mask yields 0.
///
/// # Errors
///
/// * `DimensionMismatch` - `mask` is not the size of `src`
/// * `UnsupportedChannelCount` - `C` is not 1, 3 or 4
/// * `StreamTerminated` - the stream can no longer accept work
pub fn norm_masked<'scope, T, const C: usize>(
    stream: &Stream<'scope, '_>,
    src: ImageView<'scope, T, C>,
    mask: MaskView<'scope>,
    norm_type: NormType,
    out: &'scope mut f64,
) -> Result<()>
where
    T: Element,
{
    enqueue_norm(stream, src, Some(mask), norm_type, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imageops_kernels::context::{ContextConfig, ExecutionContext};

    #[test]
    fn norm_type_from_raw_codes() {
        assert_eq!(NormType::try_from(1), Ok(NormType::Inf));
        assert_eq!(NormType::try_from(2), Ok(NormType::L1));
        assert_eq!(NormType::try_from(4), Ok(NormType::L2));
        assert_eq!(NormType::try_from(3), Err(KernelError::InvalidNormKind(3)));
        assert_eq!(i32::from(NormType::L2), 4);
    }

    #[test]
    fn compute_norm_on_small_signed_image() {
        let data = [3.0f32, -4.0, 0.0, -1.0];
        let view = ImageView::<f32, 1>::packed(2, 2, &data).unwrap();

        assert_eq!(compute_norm(view, None, NormType::Inf, 4), 4.0);
        assert_eq!(compute_norm(view, None, NormType::L1, 4), 8.0);
        assert!((compute_norm(view, None, NormType::L2, 4) - 26.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn compute_norm_is_independent_of_group_count() {
        let data: Vec<u8> = (0..=255).cycle().take(37 * 11 * 3).collect();
        let view = ImageView::<u8, 3>::packed(37, 11, &data).unwrap();
        let expected = compute_norm(view, None, NormType::L1, 1);
        for groups in [2, 5, 37, 1000] {
            assert_eq!(compute_norm(view, None, NormType::L1, groups), expected);
        }
    }

    #[test]
    fn mask_selects_whole_pixels() {
        let data = [1u8, 2, 3, 10, 20, 30];
        let mask_data = [0u8, 7];
        let view = ImageView::<u8, 3>::packed(1, 2, &data).unwrap();
        let mask = MaskView::packed(1, 2, &mask_data).unwrap();

        assert_eq!(compute_norm(view, Some(mask), NormType::L1, 8), 60.0);
        assert_eq!(compute_norm(view, Some(mask), NormType::Inf, 8), 30.0);
    }

    #[test]
    fn norm_masked_rejects_mismatched_mask() {
        let context = ExecutionContext::new().unwrap();
        let data = [0u8; 6];
        let mask_data = [1u8; 3];
        let mut out = -1.0;

        let result = context
            .scope(|stream| {
                let view = ImageView::<u8, 1>::packed(2, 3, &data).unwrap();
                let mask = MaskView::packed(1, 3, &mask_data).unwrap();
                norm_masked(stream, view, mask, NormType::L1, &mut out)
            })
            .unwrap();

        assert_eq!(
            result,
            Err(KernelError::DimensionMismatch {
                expected: (2, 3),
                actual: (1, 3)
            })
        );
        assert_eq!(out, -1.0);
    }

    #[test]
    fn norm_writes_result_after_scope() {
        let context =
            ExecutionContext::with_config(ContextConfig::default().with_partial_groups(3)).unwrap();
        let data = vec![2.0f32; 10 * 4 * 4];
        let mut out = 0.0;

        context
            .scope(|stream| {
                let view = ImageView::<f32, 4>::packed(10, 4, &data).unwrap();
                norm(stream, view, NormType::L2, &mut out).unwrap();
            })
            .unwrap();

        assert!((out - (4.0f64 * 160.0).sqrt()).abs() < 1e-9);
    }
}
