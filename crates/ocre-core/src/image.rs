//! Packed image descriptors.
//!
//! An [`ImageDesc`] references a caller-owned buffer of samples together with
//! its geometry: width, height, channel count, bit depth and strides. The
//! descriptor is borrowed for the duration of an apply call; the renderer
//! assumes strides permit sequential processing.

use crate::{BitDepth, CoreError, CoreResult};

/// Sentinel meaning "derive the stride from geometry and bit depth".
pub const AUTO_STRIDE: usize = 0;

/// Typed access to the sample storage behind a descriptor.
#[derive(Debug)]
pub enum ImageData<'a> {
    /// 8-bit unsigned samples.
    U8(&'a mut [u8]),
    /// 16-bit word samples: U10/U12/U14/U16 codes, or half bit patterns for F16.
    U16(&'a mut [u16]),
    /// 32-bit unsigned samples.
    U32(&'a mut [u32]),
    /// 32-bit float samples.
    F32(&'a mut [f32]),
}

impl ImageData<'_> {
    fn len(&self) -> usize {
        match self {
            ImageData::U8(s) => s.len(),
            ImageData::U16(s) => s.len(),
            ImageData::U32(s) => s.len(),
            ImageData::F32(s) => s.len(),
        }
    }
}

/// A packed image descriptor.
///
/// Strides are expressed in bytes as in the wire contract, but the packed
/// constructors only accept layouts where samples are sequential.
#[derive(Debug)]
pub struct ImageDesc<'a> {
    data: ImageData<'a>,
    width: usize,
    height: usize,
    channels: usize,
    bit_depth: BitDepth,
    chan_stride: usize,
    x_stride: usize,
    y_stride: usize,
}

impl<'a> ImageDesc<'a> {
    /// Creates a packed RGBA descriptor over a float buffer.
    pub fn packed_f32(data: &'a mut [f32], width: usize, height: usize) -> CoreResult<Self> {
        Self::new(ImageData::F32(data), width, height, 4, BitDepth::F32)
    }

    /// Creates a packed RGBA descriptor over 16-bit words with the given depth.
    ///
    /// `depth` must be one of the depths stored in 16-bit words
    /// (`U10`/`U12`/`U14`/`U16`/`F16`).
    pub fn packed_u16(
        data: &'a mut [u16],
        width: usize,
        height: usize,
        depth: BitDepth,
    ) -> CoreResult<Self> {
        Self::new(ImageData::U16(data), width, height, 4, depth)
    }

    /// Creates a packed RGBA descriptor over 8-bit samples.
    pub fn packed_u8(data: &'a mut [u8], width: usize, height: usize) -> CoreResult<Self> {
        Self::new(ImageData::U8(data), width, height, 4, BitDepth::U8)
    }

    /// Creates a descriptor with explicit geometry and auto strides.
    pub fn new(
        data: ImageData<'a>,
        width: usize,
        height: usize,
        channels: usize,
        bit_depth: BitDepth,
    ) -> CoreResult<Self> {
        Self::with_strides(
            data,
            width,
            height,
            channels,
            bit_depth,
            AUTO_STRIDE,
            AUTO_STRIDE,
            AUTO_STRIDE,
        )
    }

    /// Creates a descriptor with explicit byte strides.
    ///
    /// [`AUTO_STRIDE`] derives each stride from the geometry.
    #[allow(clippy::too_many_arguments)]
    pub fn with_strides(
        data: ImageData<'a>,
        width: usize,
        height: usize,
        channels: usize,
        bit_depth: BitDepth,
        chan_stride: usize,
        x_stride: usize,
        y_stride: usize,
    ) -> CoreResult<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidDimensions { width, height });
        }
        if channels == 0 || channels > 4 {
            return Err(CoreError::UnsupportedChannels { channels });
        }

        let sample = bit_depth.bytes_per_sample();
        let chan_stride = if chan_stride == AUTO_STRIDE { sample } else { chan_stride };
        let x_stride = if x_stride == AUTO_STRIDE { chan_stride * channels } else { x_stride };
        let y_stride = if y_stride == AUTO_STRIDE { x_stride * width } else { y_stride };
        for stride in [chan_stride, x_stride, y_stride] {
            if stride % sample != 0 {
                return Err(CoreError::MisalignedStride { stride, depth: bit_depth });
            }
        }

        let required = width * height * channels;
        if data.len() < required {
            return Err(CoreError::BufferTooSmall {
                actual: data.len(),
                required,
                width,
                height,
                channels,
            });
        }

        Ok(Self {
            data,
            width,
            height,
            channels,
            bit_depth,
            chan_stride,
            x_stride,
            y_stride,
        })
    }

    /// Image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Channels per pixel.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Total pixel count.
    pub fn num_pixels(&self) -> usize {
        self.width * self.height
    }

    /// Declared bit depth.
    pub fn bit_depth(&self) -> BitDepth {
        self.bit_depth
    }

    /// Channel stride in bytes.
    pub fn chan_stride(&self) -> usize {
        self.chan_stride
    }

    /// Pixel stride in bytes.
    pub fn x_stride(&self) -> usize {
        self.x_stride
    }

    /// Row stride in bytes.
    pub fn y_stride(&self) -> usize {
        self.y_stride
    }

    /// Borrows the typed sample storage.
    pub fn data(&self) -> &ImageData<'a> {
        &self.data
    }

    /// Mutably borrows the typed sample storage.
    pub fn data_mut(&mut self) -> &mut ImageData<'a> {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_f32_auto_strides() {
        let mut buf = vec![0.0_f32; 8 * 2 * 4];
        let desc = ImageDesc::packed_f32(&mut buf, 8, 2).unwrap();
        assert_eq!(desc.chan_stride(), 4);
        assert_eq!(desc.x_stride(), 16);
        assert_eq!(desc.y_stride(), 128);
        assert_eq!(desc.num_pixels(), 16);
    }

    #[test]
    fn buffer_too_small_rejected() {
        let mut buf = vec![0.0_f32; 7];
        let err = ImageDesc::packed_f32(&mut buf, 2, 2).unwrap_err();
        assert!(err.to_string().contains("too small"));
    }

    #[test]
    fn zero_dimensions_rejected() {
        let mut buf = vec![0.0_f32; 4];
        assert!(ImageDesc::packed_f32(&mut buf, 0, 1).is_err());
    }

    #[test]
    fn misaligned_stride_rejected() {
        let mut buf = vec![0.0_f32; 16];
        let err = ImageDesc::with_strides(
            ImageData::F32(&mut buf),
            2,
            2,
            4,
            BitDepth::F32,
            3,
            AUTO_STRIDE,
            AUTO_STRIDE,
        )
        .unwrap_err();
        assert!(err.to_string().contains("stride"));
    }

    #[test]
    fn u16_depth_tags() {
        let mut buf = vec![0_u16; 4 * 4];
        let desc = ImageDesc::packed_u16(&mut buf, 2, 2, BitDepth::U10).unwrap();
        assert_eq!(desc.bit_depth(), BitDepth::U10);
        assert_eq!(desc.chan_stride(), 2);
    }
}
