//! Pixel element types understood by the kernels.

use bytemuck::Pod;
use image::Primitive;

use crate::error::{KernelError, Result};
use crate::utils::{clamp_f32_to_primitive, validate_channels};

/// Element type tag carried by untyped image descriptors.
///
/// A descriptor may name any of these, but kernels are only instantiated for
/// [`ElementType::U8`] and [`ElementType::F32`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    U8,
    U16,
    I16,
    F32,
    F64,
}

impl ElementType {
    /// Size of one element in bytes
    #[must_use]
    pub const fn size_of(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /// Whether kernels exist for this element type
    #[must_use]
    pub const fn is_supported(self) -> bool {
        matches!(self, Self::U8 | Self::F32)
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for f32 {}
}

/// Numeric element a kernel can be instantiated for.
///
/// Kernels accumulate in floating point and convert back on store with
/// [`Element::saturate`], which rounds to nearest and saturates for integer
/// types and is the identity for floats.
pub trait Element: sealed::Sealed + Primitive + Pod + Send + Sync + 'static {
    /// Runtime tag of this element type
    const ELEMENT_TYPE: ElementType;

    /// Accumulator for runs of box filter window samples
    type Sum: Primitive + Default + Send + Sync;

    fn as_f32(self) -> f32;

    fn as_f64(self) -> f64;

    fn widen(self) -> Self::Sum;

    fn sum_to_f64(sum: Self::Sum) -> f64;

    /// Converts a working-precision value into this element type
    fn saturate(value: f32) -> Self;

    /// Same as [`Element::saturate`] from a double precision value
    fn saturate_f64(value: f64) -> Self;
}

impl Element for u8 {
    const ELEMENT_TYPE: ElementType = ElementType::U8;
    type Sum = u64;

    #[inline]
    fn as_f32(self) -> f32 {
        f32::from(self)
    }

    #[inline]
    fn as_f64(self) -> f64 {
        f64::from(self)
    }

    #[inline]
    fn widen(self) -> u64 {
        u64::from(self)
    }

    #[inline]
    fn sum_to_f64(sum: u64) -> f64 {
        sum as f64
    }

    #[inline]
    fn saturate(value: f32) -> Self {
        clamp_f32_to_primitive(value.round())
    }

    #[inline]
    fn saturate_f64(value: f64) -> Self {
        clamp_f32_to_primitive(value.round() as f32)
    }
}

impl Element for f32 {
    const ELEMENT_TYPE: ElementType = ElementType::F32;
    type Sum = f64;

    #[inline]
    fn as_f32(self) -> f32 {
        self
    }

    #[inline]
    fn as_f64(self) -> f64 {
        f64::from(self)
    }

    #[inline]
    fn widen(self) -> f64 {
        f64::from(self)
    }

    #[inline]
    fn sum_to_f64(sum: f64) -> f64 {
        sum
    }

    #[inline]
    fn saturate(value: f32) -> Self {
        value
    }

    #[inline]
    fn saturate_f64(value: f64) -> Self {
        value as f32
    }
}

/// Checks that a kernel exists for element `T` with `C` channels.
pub(crate) fn validate_instantiation<T: Element, const C: usize>() -> Result<()> {
    if !T::ELEMENT_TYPE.is_supported() {
        return Err(KernelError::UnsupportedElementType(T::ELEMENT_TYPE));
    }
    validate_channels(C)
}
