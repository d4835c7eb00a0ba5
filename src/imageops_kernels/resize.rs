use crate::error::Result;
use crate::imageops_kernels::context::Stream;
use crate::imageops_kernels::element::Element;
use crate::imageops_kernels::inter_area::resize_area;
use crate::imageops_kernels::resize_linear::resize_linear;
use crate::imageops_kernels::resize_nearest::resize_nearest;
use crate::imageops_kernels::view::{ImageView, ImageViewMut};

/// Resampling mode of [`resize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Interpolation {
    /// Copy of the source pixel at `floor(d * src / dst)`
    Nearest,
    /// Pixel-center aligned bilinear blend
    #[default]
    Linear,
    /// Area-weighted average of the covered source pixels
    Area,
}

/// Enqueues a resize of `src` into `dst` with the given interpolation.
///
/// The target geometry is the geometry of `dst`.
///
/// # Examples
///
/// ```no_run
/// use imageops_kernels::{resize, ExecutionContext, ImageView, ImageViewMut, Interpolation};
///
/// # fn example() -> imageops_kernels::Result<()> {
/// let context = ExecutionContext::new()?;
/// let src = vec![0u8; 480 * 642 * 3];
/// let mut dst = vec![0u8; 240 * 321 * 3];
///
/// context.scope(|stream| -> imageops_kernels::Result<()> {
///     let src = ImageView::<u8, 3>::packed(480, 642, &src)?;
///     let dst = ImageViewMut::<u8, 3>::packed(240, 321, &mut dst)?;
///     resize(stream, src, dst, Interpolation::Area)
/// })??;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// * `UnsupportedChannelCount` - `C` is not 1, 3 or 4
/// * `StreamTerminated` - the stream can no longer accept work
pub fn resize<'scope, T, const C: usize>(
    stream: &Stream<'scope, '_>,
    src: ImageView<'scope, T, C>,
    dst: ImageViewMut<'scope, T, C>,
    interpolation: Interpolation,
) -> Result<()>
where
    T: Element,
{
    match interpolation {
        Interpolation::Nearest => resize_nearest(stream, src, dst),
        Interpolation::Linear => resize_linear(stream, src, dst),
        Interpolation::Area => resize_area(stream, src, dst),
    }
}
