use thiserror::Error;

use crate::imageops_kernels::element::ElementType;

/// Result type for kernel launches and context management
pub type Result<T> = std::result::Result<T, KernelError>;

/// Error type for every kernel entry point
///
/// All variants are produced synchronously, before anything is enqueued on a
/// stream. A launch that returns an error performed no work.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    /// Height or width of a source or destination image is zero
    #[error("Invalid image dimensions: {height}x{width} (height x width) must be non-zero")]
    InvalidDimension {
        /// Rows of the offending image
        height: usize,
        /// Columns of the offending image
        width: usize,
    },

    /// Row stride is smaller than `width * channels`
    ///
    /// Strides are counted in elements, not bytes.
    #[error("Invalid stride: {stride} elements, at least {minimum} required")]
    InvalidStride { stride: usize, minimum: usize },

    /// A box filter window has a zero extent
    #[error("Invalid kernel size: {ksize_x}x{ksize_y} must be non-zero")]
    InvalidKernelSize { ksize_x: usize, ksize_y: usize },

    /// Unrecognized norm selector
    #[error("Invalid norm kind: {0}")]
    InvalidNormKind(i32),

    /// Unrecognized border selector
    #[error("Invalid border type: {0}")]
    InvalidBorderType(i32),

    /// A mask does not have the spatial dimensions of its image
    #[error("Image and mask dimensions do not match: expected {expected:?}, actual {actual:?}")]
    DimensionMismatch {
        /// Expected dimensions (height, width)
        expected: (usize, usize),
        /// Actual dimensions (height, width)
        actual: (usize, usize),
    },

    /// Channel count outside {1, 3, 4}
    #[error("Unsupported channel count: {0} (1, 3 and 4 are supported)")]
    UnsupportedChannelCount(usize),

    /// Element type other than 8-bit unsigned or 32-bit float
    #[error("Unsupported element type: {0:?}")]
    UnsupportedElementType(ElementType),

    /// A buffer is missing (empty slice)
    #[error("Null buffer pointer")]
    NullPointer,

    /// A buffer is too short for its declared geometry
    #[error("Buffer too small: {required} elements required, got {actual}")]
    BufferTooSmall { required: usize, actual: usize },

    /// An untyped buffer is not aligned for its element type
    #[error("Buffer is not aligned for its element type")]
    MisalignedBuffer,

    /// Execution context configuration was rejected
    #[error("Invalid context configuration: {0}")]
    InvalidConfig(String),

    /// The worker pool or a stream thread could not be started
    #[error("Failed to create execution context: {0}")]
    ContextCreation(String),

    /// The stream sequencer stopped, usually after a kernel panicked
    #[error("Stream terminated")]
    StreamTerminated,
}
