//! Finalized processors and the CPU apply path.
//!
//! Reference: OCIO Processor, CPUProcessor (CPUProcessor.cpp)
//!
//! A [`Processor`] owns a finalized op chain and a stable cache id. A
//! [`CpuProcessor`] compiles the chain to kernels for a fixed input depth
//! and walks image descriptors scanline by scanline: integer and half
//! samples are normalized to [0, 1] float, the kernels run on RGBA pixels,
//! and integer outputs round half to even and clamp to the code range.
//!
//! Apply is blocking and single-threaded; a `CpuProcessor` is immutable
//! after construction, so separate apply calls on disjoint descriptors may
//! run concurrently.

use std::hash::{DefaultHasher, Hash, Hasher};

use ocre_core::image::ImageData;
use ocre_core::{BitDepth, ImageDesc};
use ocre_math::{f32_to_half_bits, half_bits_to_f32};
use ocre_ops::{CpuKernel, Op, OpChain, OptimizationFlags};
use tracing::debug;

use crate::builder::TransformBuilder;
use crate::error::{ProcError, ProcResult};
use crate::transform::Transform;

/// A finalized color transformation.
#[derive(Debug)]
pub struct Processor {
    chain: OpChain,
    cache_id: String,
}

impl Processor {
    /// Finalizes `chain` under `flags` and wraps it.
    pub fn from_chain(mut chain: OpChain, flags: OptimizationFlags) -> ProcResult<Self> {
        chain.finalize(flags)?;
        let cache_id = digest(&chain.cache_id());
        debug!(ops = chain.len(), cache_id, "processor finalized");
        Ok(Self { chain, cache_id })
    }

    /// Builds and finalizes a processor from a transform tree with default
    /// optimization.
    pub fn from_transform(transform: &Transform) -> ProcResult<Self> {
        Self::with_flags(transform, OptimizationFlags::DEFAULT)
    }

    /// Builds and finalizes a processor with explicit optimization flags.
    pub fn with_flags(transform: &Transform, flags: OptimizationFlags) -> ProcResult<Self> {
        Self::from_chain(TransformBuilder::new().build(transform)?, flags)
    }

    /// True when the finalized chain is empty and apply is a no-op.
    pub fn is_noop(&self) -> bool {
        self.chain.is_empty()
    }

    /// Number of ops surviving finalization.
    pub fn num_ops(&self) -> usize {
        self.chain.len()
    }

    /// The finalized ops.
    pub fn ops(&self) -> &[Op] {
        self.chain.ops()
    }

    /// Digest of every op parameter; equal chains share a cache id.
    pub fn cache_id(&self) -> &str {
        &self.cache_id
    }

    /// Compiles kernels for 32-bit float input.
    pub fn cpu(&self) -> ProcResult<CpuProcessor> {
        self.cpu_for_depth(BitDepth::F32)
    }

    /// Compiles kernels for images of the given input depth.
    ///
    /// An integer depth lets a leading 1D LUT use its per-code lookup path.
    pub fn cpu_for_depth(&self, in_depth: BitDepth) -> ProcResult<CpuProcessor> {
        let mut kernels = Vec::with_capacity(self.chain.len());
        for (i, op) in self.chain.iter().enumerate() {
            let kernel = if i == 0 {
                CpuKernel::with_input_depth(op, in_depth)?
            } else {
                CpuKernel::new(op)?
            };
            kernels.push(kernel);
        }
        Ok(CpuProcessor {
            kernels,
            in_depth,
            cache_id: self.cache_id.clone(),
        })
    }
}

fn digest(cache_id: &str) -> String {
    let mut hasher = DefaultHasher::new();
    cache_id.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Kernels compiled for one input depth, ready to apply to images.
#[derive(Debug)]
pub struct CpuProcessor {
    kernels: Vec<CpuKernel>,
    in_depth: BitDepth,
    cache_id: String,
}

/// Sample-unit geometry of one descriptor.
struct Layout {
    width: usize,
    height: usize,
    channels: usize,
    chan_stride: usize,
    x_stride: usize,
    y_stride: usize,
}

impl CpuProcessor {
    /// The depth the kernels were compiled for.
    pub fn input_depth(&self) -> BitDepth {
        self.in_depth
    }

    /// Cache id inherited from the processor.
    pub fn cache_id(&self) -> &str {
        &self.cache_id
    }

    /// Applies the chain in place to packed RGBA float pixels.
    pub fn apply_rgba(&self, pixels: &mut [f32]) {
        for kernel in &self.kernels {
            kernel.apply_rgba(pixels);
        }
    }

    /// Applies the chain in place to an image descriptor.
    ///
    /// The descriptor's depth must match the depth the kernels were
    /// compiled for.
    pub fn apply(&self, desc: &mut ImageDesc<'_>) -> ProcResult<()> {
        let depth = desc.bit_depth();
        if depth != self.in_depth {
            return Err(ProcError::UnsupportedLayout {
                reason: format!(
                    "image depth {depth} does not match compiled depth {}",
                    self.in_depth
                ),
            });
        }

        let sample = depth.bytes_per_sample();
        let layout = Layout {
            width: desc.width(),
            height: desc.height(),
            channels: desc.channels(),
            chan_stride: desc.chan_stride() / sample,
            x_stride: desc.x_stride() / sample,
            y_stride: desc.y_stride() / sample,
        };

        match desc.data_mut() {
            ImageData::U8(buf) => {
                let max = BitDepth::U8.max_value();
                self.apply_plane(
                    buf,
                    &layout,
                    |v| (v as f64 / max) as f32,
                    |f| quantize(f, max) as u8,
                );
            }
            ImageData::U16(buf) if depth == BitDepth::F16 => {
                self.apply_plane(buf, &layout, half_bits_to_f32, f32_to_half_bits);
            }
            ImageData::U16(buf) => {
                let max = depth.max_value();
                self.apply_plane(
                    buf,
                    &layout,
                    |v| (v as f64 / max) as f32,
                    |f| quantize(f, max) as u16,
                );
            }
            ImageData::U32(buf) => {
                let max = BitDepth::U32.max_value();
                self.apply_plane(
                    buf,
                    &layout,
                    |v| (v as f64 / max) as f32,
                    |f| quantize(f, max) as u32,
                );
            }
            ImageData::F32(buf) => {
                self.apply_plane(buf, &layout, |v| v, |f| f);
            }
        }
        Ok(())
    }

    /// Scanline loop shared by every storage type.
    ///
    /// Pixels are gathered into an RGBA line, run through the kernels, and
    /// scattered back; channels the image lacks are fed as 0 (alpha as 1).
    fn apply_plane<T: Copy>(
        &self,
        buf: &mut [T],
        layout: &Layout,
        read: impl Fn(T) -> f32,
        write: impl Fn(f32) -> T,
    ) {
        let mut line = vec![0.0_f32; layout.width * 4];
        for y in 0..layout.height {
            for x in 0..layout.width {
                let base = y * layout.y_stride + x * layout.x_stride;
                let px = &mut line[x * 4..x * 4 + 4];
                for c in 0..4 {
                    px[c] = if c < layout.channels {
                        read(buf[base + c * layout.chan_stride])
                    } else if c == 3 {
                        1.0
                    } else {
                        0.0
                    };
                }
            }
            for kernel in &self.kernels {
                kernel.apply_rgba(&mut line);
            }
            for x in 0..layout.width {
                let base = y * layout.y_stride + x * layout.x_stride;
                for c in 0..layout.channels {
                    buf[base + c * layout.chan_stride] = write(line[x * 4 + c]);
                }
            }
        }
    }
}

/// Normalized float to integer code: round half to even, clamp to [0, max].
/// NaN lands on 0 through the saturating cast.
fn quantize(value: f32, max: f64) -> f64 {
    (value as f64 * max).round_ties_even().clamp(0.0, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{LogTransform, MatrixTransform, RangeTransform};
    use approx::assert_abs_diff_eq;
    use ocre_ops::Direction;

    fn scale_transform(s: f64) -> Transform {
        let mut m = [0.0; 16];
        for i in 0..4 {
            m[i * 4 + i] = if i == 3 { 1.0 } else { s };
        }
        Transform::matrix(m)
    }

    #[test]
    fn matrix_scales_float_image() {
        let proc = Processor::from_transform(&scale_transform(2.0)).unwrap();
        let cpu = proc.cpu().unwrap();

        let mut pixels = vec![0.25_f32; 16];
        let mut desc = ImageDesc::packed_f32(&mut pixels, 2, 2).unwrap();
        cpu.apply(&mut desc).unwrap();
        for px in pixels.chunks(4) {
            assert_abs_diff_eq!(px[0], 0.5, epsilon = 1e-6);
            assert_abs_diff_eq!(px[3], 0.25, epsilon = 1e-6);
        }
    }

    #[test]
    fn range_clamp_scenario() {
        let proc = Processor::from_transform(&Transform::Range(RangeTransform {
            min_in: Some(0.0),
            max_in: Some(1.0),
            min_out: Some(0.5),
            max_out: Some(1.5),
            clamp: true,
            direction: Direction::Forward,
        }))
        .unwrap();
        let cpu = proc.cpu().unwrap();

        let mut px = [-0.5, -0.25, 0.5, 0.0];
        cpu.apply_rgba(&mut px);
        assert_abs_diff_eq!(px[0], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(px[1], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(px[2], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(px[3], 0.0, epsilon = 1e-6);

        let mut high = [1.25, 1.5, 1.75, f32::NAN];
        cpu.apply_rgba(&mut high);
        assert_abs_diff_eq!(high[0], 1.5, epsilon = 1e-6);
        assert_abs_diff_eq!(high[2], 1.5, epsilon = 1e-6);
        assert!(high[3].is_nan(), "alpha must pass through untouched");
    }

    #[test]
    fn u8_identity_roundtrip_is_exact() {
        let proc = Processor::from_transform(&Transform::group(Vec::new())).unwrap();
        assert!(proc.is_noop());
        let cpu = proc.cpu_for_depth(BitDepth::U8).unwrap();

        let mut codes: Vec<u8> = (0..=255).collect();
        codes.extend_from_slice(&[0; 4]);
        let original = codes.clone();
        let mut desc = ImageDesc::packed_u8(&mut codes, 65, 1).unwrap();
        cpu.apply(&mut desc).unwrap();
        assert_eq!(codes, original);
    }

    #[test]
    fn u8_output_rounds_and_clamps() {
        let proc = Processor::from_transform(&scale_transform(2.0)).unwrap();
        let cpu = proc.cpu_for_depth(BitDepth::U8).unwrap();

        let mut codes = vec![100_u8, 200, 51, 255];
        let mut desc = ImageDesc::packed_u8(&mut codes, 1, 1).unwrap();
        cpu.apply(&mut desc).unwrap();
        assert_eq!(codes[0], 200);
        assert_eq!(codes[1], 255, "overflow clamps to the code range");
        assert_eq!(codes[2], 102);
        assert_eq!(codes[3], 255, "alpha diagonal is 1, code is unchanged");
    }

    #[test]
    fn f16_image_converts_through_half_bits() {
        let proc = Processor::from_transform(&scale_transform(2.0)).unwrap();
        let cpu = proc.cpu_for_depth(BitDepth::F16).unwrap();

        // 0x3C00 is half 1.0, 0x4000 is half 2.0.
        let mut words = vec![0x3C00_u16, 0x3C00, 0x3C00, 0x3C00];
        let mut desc = ImageDesc::packed_u16(&mut words, 1, 1, BitDepth::F16).unwrap();
        cpu.apply(&mut desc).unwrap();
        assert_eq!(words[0], 0x4000);
    }

    #[test]
    fn depth_mismatch_is_rejected() {
        let proc = Processor::from_transform(&scale_transform(2.0)).unwrap();
        let cpu = proc.cpu().unwrap();

        let mut codes = vec![0_u8; 4];
        let mut desc = ImageDesc::packed_u8(&mut codes, 1, 1).unwrap();
        let err = cpu.apply(&mut desc).unwrap_err();
        assert!(matches!(err, ProcError::UnsupportedLayout { .. }));
    }

    #[test]
    fn rgb_image_leaves_no_alpha_behind() {
        let proc = Processor::from_transform(&scale_transform(0.5)).unwrap();
        let cpu = proc.cpu().unwrap();

        let mut pixels = vec![1.0_f32; 6];
        let mut desc = ImageDesc::new(
            ocre_core::image::ImageData::F32(&mut pixels),
            2,
            1,
            3,
            BitDepth::F32,
        )
        .unwrap();
        cpu.apply(&mut desc).unwrap();
        for v in &pixels {
            assert_abs_diff_eq!(*v, 0.5, epsilon = 1e-6);
        }
    }

    #[test]
    fn cache_id_tracks_parameters() {
        let a = Processor::from_transform(&scale_transform(2.0)).unwrap();
        let b = Processor::from_transform(&scale_transform(2.0)).unwrap();
        let c = Processor::from_transform(&scale_transform(2.0001)).unwrap();
        assert_eq!(a.cache_id(), b.cache_id());
        assert_ne!(a.cache_id(), c.cache_id());
    }

    #[test]
    fn finalize_collapses_matrix_pair() {
        let t = Transform::group(vec![scale_transform(2.0), scale_transform(2.0).inverse()]);
        let proc = Processor::from_transform(&t).unwrap();
        assert!(proc.is_noop());

        let kept = Processor::with_flags(&t, OptimizationFlags::NONE).unwrap();
        assert_eq!(kept.num_ops(), 2);
    }

    #[test]
    fn log_chain_applies_in_order() {
        let t = Transform::group(vec![
            scale_transform(2.0),
            Transform::Log(LogTransform {
                base: 2.0,
                direction: Direction::Forward,
            }),
        ]);
        let cpu = Processor::with_flags(&t, OptimizationFlags::NONE)
            .unwrap()
            .cpu()
            .unwrap();

        let mut px = [2.0_f32, 2.0, 2.0, 1.0];
        cpu.apply_rgba(&mut px);
        // 2 * 2 = 4, log2(4) = 2.
        assert_abs_diff_eq!(px[0], 2.0, epsilon = 1e-5);
    }

    #[test]
    fn matrix_offset_applies_before_quantization() {
        let t = Transform::Matrix(MatrixTransform {
            matrix: {
                let mut m = [0.0; 16];
                for i in 0..4 {
                    m[i * 4 + i] = 1.0;
                }
                m
            },
            offset: [0.5, 0.0, 0.0, 0.0],
            direction: Direction::Forward,
        });
        let cpu = Processor::from_transform(&t)
            .unwrap()
            .cpu_for_depth(BitDepth::U16)
            .unwrap();

        let mut codes = vec![0_u16; 4];
        let mut desc = ImageDesc::packed_u16(&mut codes, 1, 1, BitDepth::U16).unwrap();
        cpu.apply(&mut desc).unwrap();
        assert_eq!(codes[0], 32768);
        assert_eq!(codes[1], 0);
    }
}
