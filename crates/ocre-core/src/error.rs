//! Error types for core operations.

use thiserror::Error;

use crate::BitDepth;

/// Result type alias using [`CoreError`].
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Errors that can occur while describing or addressing image buffers.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Image dimensions are zero or otherwise unusable.
    #[error("invalid image dimensions {width}x{height}")]
    InvalidDimensions {
        /// Declared width.
        width: usize,
        /// Declared height.
        height: usize,
    },

    /// The backing buffer is too small for the declared geometry.
    #[error(
        "buffer of {actual} samples is too small for {width}x{height}x{channels} ({required} required)"
    )]
    BufferTooSmall {
        /// Samples available.
        actual: usize,
        /// Samples required.
        required: usize,
        /// Declared width.
        width: usize,
        /// Declared height.
        height: usize,
        /// Declared channel count.
        channels: usize,
    },

    /// A stride does not line up with the sample size.
    #[error("stride of {stride} bytes is not a multiple of the {depth} sample size")]
    MisalignedStride {
        /// Offending stride in bytes.
        stride: usize,
        /// Bit depth whose sample size the stride must honor.
        depth: BitDepth,
    },

    /// Channel count outside the supported 1..=4 range.
    #[error("unsupported channel count {channels} (expected 1 to 4)")]
    UnsupportedChannels {
        /// Declared channel count.
        channels: usize,
    },
}
