mod error;
mod imageops_kernels;
#[cfg(test)]
mod test_utils;
mod utils;

use image::{ImageBuffer, Pixel};

pub use error::{KernelError, Result};
pub use imageops_kernels::border::{border_interpolate, border_table, BorderType};
pub use imageops_kernels::box_filter::{box_filter, BoxFilter};
pub use imageops_kernels::context::{ContextConfig, ExecutionContext, Stream};
pub use imageops_kernels::dispatch::{
    box_filter_raw, norm_raw, resize_raw, ImageDesc, RawImageView, RawImageViewMut,
};
pub use imageops_kernels::element::{Element, ElementType};
pub use imageops_kernels::ext::ImageKernelsExt;
pub use imageops_kernels::inter_area::{resize_area, AreaRegime};
pub use imageops_kernels::norm::{norm, norm_masked, NormType};
pub use imageops_kernels::resize::{resize, Interpolation};
pub use imageops_kernels::resize_linear::resize_linear;
pub use imageops_kernels::resize_nearest::resize_nearest;
pub use imageops_kernels::view::{ImageView, ImageViewMut, MaskView};

pub type Image<P> = ImageBuffer<P, Vec<<P as Pixel>::Subpixel>>;
