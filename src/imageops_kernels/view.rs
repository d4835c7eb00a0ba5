//! Strided, non-owning image views.
//!
//! A view describes `height` rows of `width` pixels with `C` interleaved
//! channels, where consecutive rows start `stride` elements apart. Views
//! never own memory; the borrow they hold is what keeps the buffer alive
//! while a kernel reading or writing it is in flight.

use image::{ImageBuffer, Pixel};
use rayon::prelude::*;

use crate::error::{KernelError, Result};
use crate::utils::validate_strided_buffer;

/// Read-only view of a strided pixel buffer.
#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a, T, const C: usize> {
    height: usize,
    width: usize,
    stride: usize,
    data: &'a [T],
}

impl<'a, T, const C: usize> ImageView<'a, T, C> {
    /// Creates a view over `data`.
    ///
    /// # Arguments
    ///
    /// * `height` - Rows of the image
    /// * `width` - Pixels per row
    /// * `stride` - Elements between row starts, at least `width * C`
    /// * `data` - Backing buffer, at least `(height - 1) * stride + width * C` long
    ///
    /// # Errors
    ///
    /// * `InvalidDimension` - height or width is zero
    /// * `InvalidStride` - stride shorter than one row of pixels
    /// * `NullPointer` - `data` is empty
    /// * `BufferTooSmall` - `data` cannot hold the last row
    pub fn new(height: usize, width: usize, stride: usize, data: &'a [T]) -> Result<Self> {
        validate_strided_buffer(height, width, C, stride, data.len())?;
        Ok(Self {
            height,
            width,
            stride,
            data,
        })
    }

    /// Creates a view over a tightly packed buffer (`stride == width * C`).
    pub fn packed(height: usize, width: usize, data: &'a [T]) -> Result<Self> {
        Self::new(height, width, width.saturating_mul(C), data)
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Row stride in elements
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.stride
    }

    #[must_use]
    pub const fn channels(&self) -> usize {
        C
    }

    /// Spatial dimensions as (height, width)
    #[must_use]
    pub const fn dimensions(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// The `width * C` elements of row `y`, without the stride padding.
    #[must_use]
    pub fn row(&self, y: usize) -> &'a [T] {
        let start = y * self.stride;
        &self.data[start..start + self.width * C]
    }

    /// The `C` channel values of pixel (y, x).
    #[must_use]
    pub fn pixel(&self, y: usize, x: usize) -> &'a [T] {
        let start = y * self.stride + x * C;
        &self.data[start..start + C]
    }

    #[must_use]
    pub const fn data(&self) -> &'a [T] {
        self.data
    }
}

/// Writable view of a strided pixel buffer.
#[derive(Debug)]
pub struct ImageViewMut<'a, T, const C: usize> {
    height: usize,
    width: usize,
    stride: usize,
    data: &'a mut [T],
}

impl<'a, T, const C: usize> ImageViewMut<'a, T, C> {
    /// Creates a writable view over `data`, see [`ImageView::new`].
    pub fn new(height: usize, width: usize, stride: usize, data: &'a mut [T]) -> Result<Self> {
        validate_strided_buffer(height, width, C, stride, data.len())?;
        Ok(Self {
            height,
            width,
            stride,
            data,
        })
    }

    /// Creates a writable view over a tightly packed buffer.
    pub fn packed(height: usize, width: usize, data: &'a mut [T]) -> Result<Self> {
        Self::new(height, width, width.saturating_mul(C), data)
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub const fn stride(&self) -> usize {
        self.stride
    }

    #[must_use]
    pub const fn channels(&self) -> usize {
        C
    }

    #[must_use]
    pub const fn dimensions(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Reborrows this view as read-only.
    #[must_use]
    pub fn as_view(&self) -> ImageView<'_, T, C> {
        ImageView {
            height: self.height,
            width: self.width,
            stride: self.stride,
            data: self.data,
        }
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        let start = y * self.stride;
        &mut self.data[start..start + self.width * C]
    }
}

impl<'a, T: Send, const C: usize> ImageViewMut<'a, T, C> {
    /// Splits the view into its rows for data-parallel writes.
    ///
    /// Yields `(y, row)` where `row` holds the `width * C` visible elements.
    pub(crate) fn into_par_rows(self) -> impl IndexedParallelIterator<Item = (usize, &'a mut [T])> {
        let row_len = self.width * C;
        self.data
            .par_chunks_mut(self.stride)
            .take(self.height)
            .map(move |row| &mut row[..row_len])
            .enumerate()
    }
}

/// Single-channel 8-bit mask view; nonzero selects the pixel.
pub type MaskView<'a> = ImageView<'a, u8, 1>;

fn checked_channels<P: Pixel, const C: usize>() -> Result<()> {
    let channels = usize::from(P::CHANNEL_COUNT);
    if channels == C {
        Ok(())
    } else {
        Err(KernelError::UnsupportedChannelCount(channels))
    }
}

impl<'a, P, const C: usize> TryFrom<&'a ImageBuffer<P, Vec<P::Subpixel>>>
    for ImageView<'a, P::Subpixel, C>
where
    P: Pixel,
{
    type Error = KernelError;

    fn try_from(image: &'a ImageBuffer<P, Vec<P::Subpixel>>) -> Result<Self> {
        checked_channels::<P, C>()?;
        let (width, height) = image.dimensions();
        Self::packed(height as usize, width as usize, image.as_raw())
    }
}

impl<'a, P, const C: usize> TryFrom<&'a mut ImageBuffer<P, Vec<P::Subpixel>>>
    for ImageViewMut<'a, P::Subpixel, C>
where
    P: Pixel,
{
    type Error = KernelError;

    fn try_from(image: &'a mut ImageBuffer<P, Vec<P::Subpixel>>) -> Result<Self> {
        checked_channels::<P, C>()?;
        let (width, height) = image.dimensions();
        Self::packed(height as usize, width as usize, &mut **image)
    }
}
