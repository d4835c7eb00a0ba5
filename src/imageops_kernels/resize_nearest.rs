use crate::error::Result;
use crate::imageops_kernels::context::{rejected, Stream};
use crate::imageops_kernels::element::{validate_instantiation, Element};
use crate::imageops_kernels::view::{ImageView, ImageViewMut};
use rayon::prelude::*;

/// Source index for every destination index along one axis.
///
/// `floor(d * src / dst)` in exact integer arithmetic, which never leaves
/// the source axis since `d < dst`.
fn nearest_table(src_size: usize, dst_size: usize) -> Vec<usize> {
    (0..dst_size).map(|d| d * src_size / dst_size).collect()
}

/// Enqueues a nearest-neighbour resize of `src` into `dst`.
///
/// Destination pixel (dy, dx) is a verbatim copy of source pixel
/// `(floor(dy * srcH / dstH), floor(dx * srcW / dstW))`.
///
/// # Errors
///
/// * `UnsupportedChannelCount` - `C` is not 1, 3 or 4
/// * `StreamTerminated` - the stream can no longer accept work
pub fn resize_nearest<'scope, T, const C: usize>(
    stream: &Stream<'scope, '_>,
    src: ImageView<'scope, T, C>,
    dst: ImageViewMut<'scope, T, C>,
) -> Result<()>
where
    T: Element,
{
    validate_instantiation::<T, C>().map_err(|err| rejected("resize_nearest", err))?;

    tracing::debug!(
        stream = stream.id(),
        src_height = src.height(),
        src_width = src.width(),
        dst_height = dst.height(),
        dst_width = dst.width(),
        channels = C,
        "launch resize_nearest"
    );

    stream.launch("resize_nearest", move || {
        let x_table = nearest_table(src.width(), dst.width());
        let y_table = nearest_table(src.height(), dst.height());

        dst.into_par_rows().for_each(|(dy, row)| {
            let src_row = src.row(y_table[dy]);
            for (pixel, &sx) in row.chunks_exact_mut(C).zip(&x_table) {
                pixel.copy_from_slice(&src_row[sx * C..sx * C + C]);
            }
        });
    })
}
