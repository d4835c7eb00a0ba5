use image::{Luma, Rgb, Rgba};

use crate::error::Result;
use crate::imageops_kernels::box_filter::BoxFilter;
use crate::imageops_kernels::context::ExecutionContext;
use crate::imageops_kernels::norm::{self, NormType};
use crate::imageops_kernels::resize::{resize, Interpolation};
use crate::imageops_kernels::view::{ImageView, ImageViewMut, MaskView};
use crate::Image;

/// Blocking kernel launches on owned images.
///
/// Every call runs on [`ExecutionContext::global`], waits for the kernel and
/// allocates its output. Implemented for `Luma`, `Rgb` and `Rgba` images of
/// `u8` or `f32`.
pub trait ImageKernelsExt: Sized {
    /// Resizes to `width x height`.
    ///
    /// # Errors
    ///
    /// * `InvalidDimension` - either side of the source or target is zero
    fn resized(&self, width: u32, height: u32, interpolation: Interpolation) -> Result<Self>;

    /// Applies `filter`, keeping the image size.
    ///
    /// # Errors
    ///
    /// * `InvalidDimension` - the image is empty
    fn box_filtered(&self, filter: &BoxFilter) -> Result<Self>;

    /// Norm over all elements.
    ///
    /// # Errors
    ///
    /// * `InvalidDimension` - the image is empty
    fn norm(&self, norm_type: NormType) -> Result<f64>;

    /// Norm over the pixels where `mask` is nonzero.
    ///
    /// # Errors
    ///
    /// * `DimensionMismatch` - `mask` is not the size of the image
    fn norm_masked(&self, mask: &Image<Luma<u8>>, norm_type: NormType) -> Result<f64>;
}

macro_rules! impl_image_kernels_ext {
    ($pixel:ident, $t:ty, $c:literal) => {
        impl ImageKernelsExt for Image<$pixel<$t>> {
            fn resized(
                &self,
                width: u32,
                height: u32,
                interpolation: Interpolation,
            ) -> Result<Self> {
                let mut out = Self::new(width, height);
                ExecutionContext::global()?.scope(|stream| {
                    let src = ImageView::<$t, $c>::try_from(self)?;
                    let dst = ImageViewMut::<$t, $c>::try_from(&mut out)?;
                    resize(stream, src, dst, interpolation)
                })??;
                Ok(out)
            }

            fn box_filtered(&self, filter: &BoxFilter) -> Result<Self> {
                let (width, height) = self.dimensions();
                let mut out = Self::new(width, height);
                ExecutionContext::global()?.scope(|stream| {
                    let src = ImageView::<$t, $c>::try_from(self)?;
                    let dst = ImageViewMut::<$t, $c>::try_from(&mut out)?;
                    filter.enqueue(stream, src, dst)
                })??;
                Ok(out)
            }

            fn norm(&self, norm_type: NormType) -> Result<f64> {
                let mut value = 0.0;
                ExecutionContext::global()?.scope(|stream| {
                    let src = ImageView::<$t, $c>::try_from(self)?;
                    norm::norm(stream, src, norm_type, &mut value)
                })??;
                Ok(value)
            }

            fn norm_masked(&self, mask: &Image<Luma<u8>>, norm_type: NormType) -> Result<f64> {
                let mut value = 0.0;
                ExecutionContext::global()?.scope(|stream| {
                    let src = ImageView::<$t, $c>::try_from(self)?;
                    let mask = MaskView::try_from(mask)?;
                    norm::norm_masked(stream, src, mask, norm_type, &mut value)
                })??;
                Ok(value)
            }
        }
    };
}

impl_image_kernels_ext!(Luma, u8, 1);
impl_image_kernels_ext!(Luma, f32, 1);
impl_image_kernels_ext!(Rgb, u8, 3);
impl_image_kernels_ext!(Rgb, f32, 3);
impl_image_kernels_ext!(Rgba, u8, 4);
impl_image_kernels_ext!(Rgba, f32, 4);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KernelError;
    use crate::imageops_kernels::border::BorderType;
    use crate::test_utils::{create_test_rgb_image, create_test_rgba_image};

    #[test]
    fn resized_with_area_averages_rgb_blocks() {
        let image = create_test_rgb_image();
        let result = image.resized(1, 1, Interpolation::Area).unwrap();
        // (200+100+150+50)/4, (150+200+100+75)/4, (100+150+200+25)/4
        assert_eq!(result.get_pixel(0, 0), &Rgb([125, 131, 119]));
    }

    #[test]
    fn resized_to_zero_fails() {
        let image = create_test_rgba_image();
        assert_eq!(
            image.resized(0, 2, Interpolation::Nearest),
            Err(KernelError::InvalidDimension {
                height: 2,
                width: 0
            })
        );
    }

    #[test]
    fn box_filtered_keeps_dimensions() {
        let image: Image<Luma<f32>> = Image::from_pixel(5, 3, Luma([0.25]));
        let filter = BoxFilter::new(3, 3)
            .unwrap()
            .with_border(BorderType::Reflect);
        let result = image.box_filtered(&filter).unwrap();
        assert_eq!(result.dimensions(), (5, 3));
        assert!(result.pixels().all(|p| (p[0] - 0.25).abs() < 1e-6));
    }

    #[test]
    fn norm_and_masked_norm_on_owned_images() {
        let image = create_test_rgba_image();
        let mut mask: Image<Luma<u8>> = Image::new(2, 2);
        mask.put_pixel(1, 1, Luma([1]));

        assert_eq!(image.norm(NormType::Inf).unwrap(), 255.0);
        assert_eq!(image.norm_masked(&mask, NormType::L1).unwrap(), 150.0);
        assert_eq!(
            image.norm_masked(&Image::new(3, 2), NormType::L1),
            Err(KernelError::DimensionMismatch {
                expected: (2, 2),
                actual: (2, 3)
            })
        );
    }
}
