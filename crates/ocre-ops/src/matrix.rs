//! Matrix op: 4x4 matrix plus offset vector.
//!
//! Reference: OCIO ops/matrix/MatrixOpData.cpp, MatrixOpCPU.cpp
//!
//! Parameters are double precision and row-major; composition happens in f64
//! and the kernel narrows to f32. Alpha participates only when the fourth
//! row/column or the fourth offset deviates from the identity.

use ocre_core::BitDepth;
use ocre_math::{simd, Mat4d};

use crate::error::{OpError, OpResult};
use crate::metadata::FormatMetadata;
use crate::op::Direction;

/// Matrix op parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixOpData {
    /// Row-major 4x4 matrix.
    pub matrix: Mat4d,
    /// Post-multiplication offset.
    pub offset: [f64; 4],
    /// Forward applies `M . in + offset`; inverse solves for the input.
    pub direction: Direction,
    /// Bit depth the source file declared for its input, if any.
    pub file_in_depth: Option<BitDepth>,
    /// Bit depth the source file declared for its output, if any.
    pub file_out_depth: Option<BitDepth>,
    /// Opaque metadata for file-format round trips.
    pub metadata: FormatMetadata,
}

impl Default for MatrixOpData {
    fn default() -> Self {
        Self::identity()
    }
}

impl MatrixOpData {
    /// The identity matrix op.
    pub fn identity() -> Self {
        Self {
            matrix: Mat4d::identity(),
            offset: [0.0; 4],
            direction: Direction::Forward,
            file_in_depth: None,
            file_out_depth: None,
            metadata: FormatMetadata::new(),
        }
    }

    /// Builds from a 4x4 matrix with zero offset.
    pub fn from_matrix(matrix: Mat4d) -> Self {
        Self {
            matrix,
            ..Self::identity()
        }
    }

    /// Builds from a 3x3 matrix embedded into a 4x4 identity.
    pub fn from_3x3(m3: [f64; 9]) -> Self {
        Self::from_matrix(Mat4d::from_3x3(m3))
    }

    /// A per-channel scale.
    pub fn from_scale(scale: [f64; 4]) -> Self {
        Self::from_matrix(Mat4d::from_diagonal(scale))
    }

    /// The diagonal matrix converting values encoded at `from` into values
    /// encoded at `to` (e.g. U10 codes into normalized floats).
    pub fn bit_depth_bridge(from: BitDepth, to: BitDepth) -> Self {
        let f = to.max_value() / from.max_value();
        Self::from_scale([f, f, f, f])
    }

    /// True when the matrix is identity and the offset is zero.
    pub fn is_identity(&self) -> bool {
        self.matrix.is_identity(1e-12) && self.offset.iter().all(|o| o.abs() < 1e-12)
    }

    /// True when only diagonal entries are non-zero.
    pub fn is_diagonal(&self) -> bool {
        self.matrix.is_diagonal(1e-12)
    }

    /// True when the op touches the alpha channel.
    pub fn has_alpha(&self) -> bool {
        let m = &self.matrix;
        self.offset[3] != 0.0
            || m.at(3, 0) != 0.0
            || m.at(3, 1) != 0.0
            || m.at(3, 2) != 0.0
            || m.at(3, 3) != 1.0
            || m.at(0, 3) != 0.0
            || m.at(1, 3) != 0.0
            || m.at(2, 3) != 0.0
    }

    /// Matrix parameters are unconstrained; validation always succeeds.
    pub fn validate(&self) -> OpResult<()> {
        Ok(())
    }

    /// Returns the algebraic inverse.
    ///
    /// The offset transforms as `-(M^-1 . offset)`. A singular matrix is an
    /// error.
    pub fn inverse(&self) -> OpResult<Self> {
        let inv = self
            .matrix
            .inverse()
            .ok_or_else(|| OpError::uninvertible("Matrix", "Singular Matrix can't be inverted"))?;
        let o = inv.apply(self.offset);
        Ok(Self {
            matrix: inv,
            offset: [-o[0], -o[1], -o[2], -o[3]],
            direction: Direction::Forward,
            file_in_depth: self.file_out_depth,
            file_out_depth: self.file_in_depth,
            metadata: self.metadata.clone(),
        })
    }

    /// Resolves the direction flag into forward parameters.
    pub fn resolved(&self) -> OpResult<Self> {
        match self.direction {
            Direction::Forward => Ok(self.clone()),
            Direction::Inverse => self.inverse(),
        }
    }

    /// Composition: applies `self` first, then `second`.
    ///
    /// Both inputs must already be resolved to forward direction.
    pub fn compose(&self, second: &Self) -> Self {
        let matrix = second.matrix.mul(&self.matrix);
        let o = second.matrix.apply(self.offset);
        let offset = [
            o[0] + second.offset[0],
            o[1] + second.offset[1],
            o[2] + second.offset[2],
            o[3] + second.offset[3],
        ];
        Self {
            matrix,
            offset,
            direction: Direction::Forward,
            file_in_depth: self.file_in_depth,
            file_out_depth: second.file_out_depth,
            metadata: FormatMetadata::new(),
        }
    }

    /// Canonical id: every numeric parameter participates.
    pub fn cache_id(&self) -> String {
        format!(
            "Matrix m={:?} o={:?} dir={}",
            self.matrix.m, self.offset, self.direction
        )
    }
}

// ============================================================================
// CPU kernel
// ============================================================================

/// Kernel shape, chosen from the resolved parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
enum MatrixKernelMode {
    /// Identity matrix: offset only (possibly zero).
    Offset,
    /// Diagonal matrix: per-channel scale plus offset.
    Scale,
    /// General 4x4 multiply.
    Full,
}

/// Prepared matrix kernel over packed RGBA f32 pixels.
#[derive(Debug, Clone)]
pub struct MatrixKernel {
    mode: MatrixKernelMode,
    m: [f32; 16],
    offset: [f32; 4],
    has_alpha: bool,
}

impl MatrixKernel {
    /// Resolves direction and captures f32 parameters.
    pub fn new(data: &MatrixOpData) -> OpResult<Self> {
        let fwd = data.resolved()?;
        let mode = if fwd.matrix.is_identity(0.0) {
            MatrixKernelMode::Offset
        } else if fwd.is_diagonal() {
            MatrixKernelMode::Scale
        } else {
            MatrixKernelMode::Full
        };
        let mut m = [0.0f32; 16];
        for (dst, src) in m.iter_mut().zip(fwd.matrix.m.iter()) {
            *dst = *src as f32;
        }
        Ok(Self {
            mode,
            m,
            offset: [
                fwd.offset[0] as f32,
                fwd.offset[1] as f32,
                fwd.offset[2] as f32,
                fwd.offset[3] as f32,
            ],
            has_alpha: fwd.has_alpha(),
        })
    }

    /// Applies to a packed RGBA buffer in place.
    pub fn apply_rgba(&self, pixels: &mut [f32]) {
        debug_assert!(pixels.len() % 4 == 0);
        for chunk in pixels.chunks_exact_mut(4) {
            let alpha = chunk[3];
            let v = [chunk[0], chunk[1], chunk[2], chunk[3]];
            let r = match self.mode {
                MatrixKernelMode::Offset => [
                    v[0] + self.offset[0],
                    v[1] + self.offset[1],
                    v[2] + self.offset[2],
                    v[3] + self.offset[3],
                ],
                MatrixKernelMode::Scale => simd::mul_add_x4(
                    v,
                    [self.m[0], self.m[5], self.m[10], self.m[15]],
                    self.offset,
                ),
                MatrixKernelMode::Full => simd::mat4_mul_add_x4(&self.m, v, self.offset),
            };
            chunk.copy_from_slice(&r);
            if !self.has_alpha {
                chunk[3] = alpha;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    #[test]
    fn identity_passes_pixels_through() {
        let data = MatrixOpData::identity();
        assert!(data.is_identity());

        let kernel = MatrixKernel::new(&data).unwrap();
        let mut pixels = [0.1, 0.2, 0.3, 0.4];
        kernel.apply_rgba(&mut pixels);
        assert_eq!(pixels, [0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn diagonal_scales_channels() {
        let data = MatrixOpData::from_scale([2.0, 3.0, 4.0, 1.0]);
        assert!(data.is_diagonal());
        assert!(!data.has_alpha());

        let kernel = MatrixKernel::new(&data).unwrap();
        let mut pixels = [0.1, 0.1, 0.1, 0.5];
        kernel.apply_rgba(&mut pixels);
        assert!((pixels[0] - 0.2).abs() < EPSILON);
        assert!((pixels[1] - 0.3).abs() < EPSILON);
        assert!((pixels[2] - 0.4).abs() < EPSILON);
        assert_eq!(pixels[3], 0.5); // alpha untouched
    }

    #[test]
    fn alpha_participates_when_fourth_row_set() {
        let mut data = MatrixOpData::identity();
        data.offset[3] = 0.25;
        assert!(data.has_alpha());

        let kernel = MatrixKernel::new(&data).unwrap();
        let mut pixels = [0.0, 0.0, 0.0, 0.5];
        kernel.apply_rgba(&mut pixels);
        assert!((pixels[3] - 0.75).abs() < EPSILON);
    }

    #[test]
    fn compose_matches_sequential_application() {
        let a = MatrixOpData {
            matrix: Mat4d::from_3x3([
                0.9, 0.1, 0.0, //
                0.0, 0.8, 0.2, //
                0.1, 0.0, 0.9,
            ]),
            offset: [0.01, 0.02, 0.03, 0.0],
            ..MatrixOpData::identity()
        };
        let b = MatrixOpData {
            matrix: Mat4d::from_diagonal([1.2, 0.9, 1.1, 1.0]),
            offset: [-0.05, 0.0, 0.05, 0.0],
            ..MatrixOpData::identity()
        };

        let combined = a.compose(&b);

        let input = [1.0, 1.0, 1.0, 1.0];
        let step1 = a.matrix.apply(input);
        let step1 = [
            step1[0] + a.offset[0],
            step1[1] + a.offset[1],
            step1[2] + a.offset[2],
            step1[3] + a.offset[3],
        ];
        let step2 = b.matrix.apply(step1);
        let expect = [
            step2[0] + b.offset[0],
            step2[1] + b.offset[1],
            step2[2] + b.offset[2],
            step2[3] + b.offset[3],
        ];

        let got = combined.matrix.apply(input);
        for i in 0..4 {
            assert!((got[i] + combined.offset[i] - expect[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn singular_matrix_inverse_fails() {
        let data = MatrixOpData::from_3x3([
            0.3, 0.3, 0.3, //
            0.3, 0.3, 0.3, //
            0.3, 0.3, 0.3,
        ]);
        let err = data.inverse().unwrap_err();
        assert!(err.to_string().contains("Singular Matrix can't be inverted"));
    }

    #[test]
    fn inverse_round_trips_offset() {
        let data = MatrixOpData {
            matrix: Mat4d::from_diagonal([2.0, 4.0, 8.0, 1.0]),
            offset: [0.1, 0.2, 0.3, 0.0],
            ..MatrixOpData::identity()
        };
        let inv = data.inverse().unwrap();
        let round = data.compose(&inv);
        assert!(round.is_identity());
    }

    #[test]
    fn bit_depth_bridge_scale() {
        use ocre_core::BitDepth;
        let bridge = MatrixOpData::bit_depth_bridge(BitDepth::U8, BitDepth::F32);
        assert!((bridge.matrix.at(0, 0) - 1.0 / 255.0).abs() < 1e-15);
    }

    #[test]
    fn cache_id_tracks_parameters() {
        let a = MatrixOpData::identity();
        let mut b = MatrixOpData::identity();
        assert_eq!(a.cache_id(), b.cache_id());
        b.offset[0] = 1e-9;
        assert_ne!(a.cache_id(), b.cache_id());
    }
}
