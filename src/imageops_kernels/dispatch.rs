//! Untyped entry points over byte buffers.
//!
//! An [`ImageDesc`] names the element type and channel count at runtime.
//! Each entry point validates the descriptors, reinterprets the bytes as the
//! named element type and dispatches once to one of the six typed kernels
//! (`u8` or `f32` with 1, 3 or 4 channels). Nothing is enqueued unless every
//! check passes.

use std::mem::size_of;

use crate::error::{KernelError, Result};
use crate::imageops_kernels::border::BorderType;
use crate::imageops_kernels::box_filter::BoxFilter;
use crate::imageops_kernels::context::{rejected, Stream};
use crate::imageops_kernels::element::{Element, ElementType};
use crate::imageops_kernels::norm::{norm, norm_masked, NormType};
use crate::imageops_kernels::resize::{resize, Interpolation};
use crate::imageops_kernels::view::{ImageView, ImageViewMut, MaskView};
use crate::utils::validate_strided_buffer;

/// Runtime description of a strided image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDesc {
    pub element_type: ElementType,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
    /// Elements (not bytes) between row starts
    pub stride: usize,
}

impl ImageDesc {
    /// Describes a tightly packed image.
    ///
    /// A row length past `usize::MAX` saturates; validation rejects such a
    /// descriptor before any launch.
    #[must_use]
    pub const fn packed(
        element_type: ElementType,
        channels: usize,
        height: usize,
        width: usize,
    ) -> Self {
        Self {
            element_type,
            channels,
            height,
            width,
            stride: width.saturating_mul(channels),
        }
    }

    /// Smallest byte buffer that holds the described image, saturating at
    /// `usize::MAX`
    #[must_use]
    pub const fn required_bytes(&self) -> usize {
        if self.height == 0 {
            return 0;
        }
        (self.height - 1)
            .saturating_mul(self.stride)
            .saturating_add(self.width.saturating_mul(self.channels))
            .saturating_mul(self.element_type.size_of())
    }
}

/// Checks `desc` against a buffer of `byte_len` bytes read as `T` and
/// returns the length in bytes of the whole elements it holds.
fn checked_byte_len<T: Element, const C: usize>(desc: &ImageDesc, byte_len: usize) -> Result<usize> {
    let elements = byte_len / size_of::<T>();
    validate_strided_buffer(desc.height, desc.width, C, desc.stride, elements)?;
    Ok(elements * size_of::<T>())
}

/// Read-only untyped image.
#[derive(Debug, Clone, Copy)]
pub struct RawImageView<'a> {
    desc: ImageDesc,
    bytes: &'a [u8],
}

impl<'a> RawImageView<'a> {
    #[must_use]
    pub const fn new(desc: ImageDesc, bytes: &'a [u8]) -> Self {
        Self { desc, bytes }
    }

    #[must_use]
    pub const fn desc(&self) -> &ImageDesc {
        &self.desc
    }

    fn typed<T: Element, const C: usize>(self) -> Result<ImageView<'a, T, C>> {
        let len = checked_byte_len::<T, C>(&self.desc, self.bytes.len())?;
        let data: &[T] = bytemuck::try_cast_slice(&self.bytes[..len])
            .map_err(|_| KernelError::MisalignedBuffer)?;
        ImageView::new(self.desc.height, self.desc.width, self.desc.stride, data)
    }
}

/// Writable untyped image.
#[derive(Debug)]
pub struct RawImageViewMut<'a> {
    desc: ImageDesc,
    bytes: &'a mut [u8],
}

impl<'a> RawImageViewMut<'a> {
    #[must_use]
    pub fn new(desc: ImageDesc, bytes: &'a mut [u8]) -> Self {
        Self { desc, bytes }
    }

    #[must_use]
    pub const fn desc(&self) -> &ImageDesc {
        &self.desc
    }

    fn into_typed<T: Element, const C: usize>(self) -> Result<ImageViewMut<'a, T, C>> {
        let Self { desc, bytes } = self;
        let len = checked_byte_len::<T, C>(&desc, bytes.len())?;
        let data: &mut [T] = bytemuck::try_cast_slice_mut(&mut bytes[..len])
            .map_err(|_| KernelError::MisalignedBuffer)?;
        ImageViewMut::new(desc.height, desc.width, desc.stride, data)
    }
}

/// Expands `$body` once per supported `(element, channels)` pair with `$t`
/// and `$c` bound to the concrete element type and channel count.
macro_rules! dispatch {
    (@arm $ty:ty, $n:literal, $t:ident, $c:ident, $body:expr) => {{
        type $t = $ty;
        const $c: usize = $n;
        $body
    }};
    ($kernel:expr, $desc:expr, |$t:ident, $c:ident| $body:expr) => {{
        let desc: &ImageDesc = $desc;
        match (desc.element_type, desc.channels) {
            (ElementType::U8, 1) => dispatch!(@arm u8, 1, $t, $c, $body),
            (ElementType::U8, 3) => dispatch!(@arm u8, 3, $t, $c, $body),
            (ElementType::U8, 4) => dispatch!(@arm u8, 4, $t, $c, $body),
            (ElementType::F32, 1) => dispatch!(@arm f32, 1, $t, $c, $body),
            (ElementType::F32, 3) => dispatch!(@arm f32, 3, $t, $c, $body),
            (ElementType::F32, 4) => dispatch!(@arm f32, 4, $t, $c, $body),
            (ElementType::U8 | ElementType::F32, channels) => Err(rejected(
                $kernel,
                KernelError::UnsupportedChannelCount(channels),
            )),
            (element_type, _) => Err(rejected(
                $kernel,
                KernelError::UnsupportedElementType(element_type),
            )),
        }
    }};
}

/// Source and destination must agree on element type and channel count.
fn validate_same_format(src: &ImageDesc, dst: &ImageDesc) -> Result<()> {
    if src.element_type != dst.element_type {
        return Err(KernelError::UnsupportedElementType(dst.element_type));
    }
    if src.channels != dst.channels {
        return Err(KernelError::UnsupportedChannelCount(dst.channels));
    }
    Ok(())
}

fn resize_typed<'scope, T: Element, const C: usize>(
    stream: &Stream<'scope, '_>,
    src: RawImageView<'scope>,
    dst: RawImageViewMut<'scope>,
    interpolation: Interpolation,
) -> Result<()> {
    let src = src.typed::<T, C>().map_err(|err| rejected("resize", err))?;
    let dst = dst.into_typed::<T, C>().map_err(|err| rejected("resize", err))?;
    resize(stream, src, dst, interpolation)
}

fn box_filter_typed<'scope, T: Element, const C: usize>(
    stream: &Stream<'scope, '_>,
    src: RawImageView<'scope>,
    dst: RawImageViewMut<'scope>,
    filter: BoxFilter,
) -> Result<()> {
    let src = src.typed::<T, C>().map_err(|err| rejected("box_filter", err))?;
    let dst = dst.into_typed::<T, C>().map_err(|err| rejected("box_filter", err))?;
    filter.enqueue(stream, src, dst)
}

fn norm_typed<'scope, T: Element, const C: usize>(
    stream: &Stream<'scope, '_>,
    src: RawImageView<'scope>,
    mask: Option<MaskView<'scope>>,
    norm_type: NormType,
    out: &'scope mut f64,
) -> Result<()> {
    let kernel = if mask.is_some() { "norm_masked" } else { "norm" };
    let src = src.typed::<T, C>().map_err(|err| rejected(kernel, err))?;
    match mask {
        Some(mask) => norm_masked(stream, src, mask, norm_type, out),
        None => norm(stream, src, norm_type, out),
    }
}

/// Untyped [`resize`].
///
/// # Errors
///
/// Everything [`resize`] reports, plus the descriptor errors:
/// `InvalidDimension`, `InvalidStride`, `NullPointer`, `BufferTooSmall`,
/// `MisalignedBuffer`, `UnsupportedElementType`, `UnsupportedChannelCount`.
pub fn resize_raw<'scope>(
    stream: &Stream<'scope, '_>,
    src: RawImageView<'scope>,
    dst: RawImageViewMut<'scope>,
    interpolation: Interpolation,
) -> Result<()> {
    validate_same_format(src.desc(), dst.desc()).map_err(|err| rejected("resize", err))?;
    let desc = *src.desc();
    dispatch!("resize", &desc, |T, C| {
        resize_typed::<T, C>(stream, src, dst, interpolation)
    })
}

/// Untyped box filter with raw selectors.
///
/// `ksize_x` and `ksize_y` must be positive and `border` is a raw
/// [`BorderType`] code.
///
/// # Errors
///
/// * `InvalidKernelSize` - a window size is zero or negative
/// * `InvalidBorderType` - unknown border code
/// * `DimensionMismatch` - `dst` is not the size of `src`
/// * the descriptor errors of [`resize_raw`]
pub fn box_filter_raw<'scope>(
    stream: &Stream<'scope, '_>,
    src: RawImageView<'scope>,
    dst: RawImageViewMut<'scope>,
    ksize_x: i32,
    ksize_y: i32,
    border: i32,
    normalize: bool,
) -> Result<()> {
    let filter = BoxFilter::new(
        usize::try_from(ksize_x).unwrap_or(0),
        usize::try_from(ksize_y).unwrap_or(0),
    )
    .and_then(|filter| {
        validate_same_format(src.desc(), dst.desc())?;
        Ok(filter
            .with_border(BorderType::try_from(border)?)
            .with_normalize(normalize))
    })
    .map_err(|err| rejected("box_filter", err))?;

    let desc = *src.desc();
    dispatch!("box_filter", &desc, |T, C| {
        box_filter_typed::<T, C>(stream, src, dst, filter)
    })
}

/// Untyped norm with a raw norm selector and an optional 8-bit mask.
///
/// # Errors
///
/// * `InvalidNormKind` - unknown norm code
/// * `DimensionMismatch` - `mask` is not the size of `src`
/// * `UnsupportedElementType` / `UnsupportedChannelCount` - `mask` is not
///   single-channel `u8`
/// * the descriptor errors of [`resize_raw`]
pub fn norm_raw<'scope>(
    stream: &Stream<'scope, '_>,
    src: RawImageView<'scope>,
    mask: Option<RawImageView<'scope>>,
    norm_type: i32,
    out: &'scope mut f64,
) -> Result<()> {
    let kernel = if mask.is_some() { "norm_masked" } else { "norm" };
    let norm_type = NormType::try_from(norm_type).map_err(|err| rejected(kernel, err))?;
    let mask = mask
        .map(|mask| match (mask.desc().element_type, mask.desc().channels) {
            (ElementType::U8, 1) => mask.typed::<u8, 1>(),
            (ElementType::U8, channels) => Err(KernelError::UnsupportedChannelCount(channels)),
            (element_type, _) => Err(KernelError::UnsupportedElementType(element_type)),
        })
        .transpose()
        .map_err(|err| rejected(kernel, err))?;

    let desc = *src.desc();
    dispatch!(kernel, &desc, |T, C| {
        norm_typed::<T, C>(stream, src, mask, norm_type, out)
    })
}
