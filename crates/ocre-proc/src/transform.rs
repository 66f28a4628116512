//! High-level transform tree handed to the builder.
//!
//! Reference: OCIO Transform subclasses (MatrixTransform, FileTransform, ...)
//!
//! A transform describes intent (a file to load, a curve to apply); the
//! builder lowers it to a chain of concrete ops. Every node carries its own
//! [`Direction`] and groups compose direction multiplicatively: an inverse
//! group applies its children reversed, each inverted.

use std::path::PathBuf;

use ocre_ops::Direction;

/// Interpolation requested for LUTs loaded from files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Linear for 1D, trilinear for 3D.
    #[default]
    Linear,
    /// Tetrahedral for 3D LUTs; 1D LUTs fall back to linear.
    Tetrahedral,
    /// Best available for the LUT dimensionality.
    Best,
}

/// One node of the transform tree.
#[derive(Debug, Clone)]
pub enum Transform {
    /// 4x4 matrix with offset.
    Matrix(MatrixTransform),
    /// Per-channel exponent (gamma).
    Exponent(ExponentTransform),
    /// Lin <-> log curve.
    Log(LogTransform),
    /// Range remap / clamp.
    Range(RangeTransform),
    /// ASC CDL grade.
    Cdl(CdlTransform),
    /// Named fixed function.
    FixedFunction(FixedFunctionTransform),
    /// LUT, matrix, or CDL loaded from a file.
    File(FileTransform),
    /// Looks resolved through a look expression.
    Look(LookTransform),
    /// Ordered children under one direction.
    Group(GroupTransform),
}

impl Transform {
    /// A matrix transform from a row-major 4x4 array, zero offset.
    pub fn matrix(matrix: [f64; 16]) -> Self {
        Self::Matrix(MatrixTransform {
            matrix,
            offset: [0.0; 4],
            direction: Direction::Forward,
        })
    }

    /// A file transform with default interpolation and no cccid.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(FileTransform {
            src: path.into(),
            cccid: None,
            interpolation: Interpolation::default(),
            direction: Direction::Forward,
        })
    }

    /// A forward group over `children`.
    pub fn group(children: Vec<Transform>) -> Self {
        Self::Group(GroupTransform {
            children,
            direction: Direction::Forward,
        })
    }

    /// The same transform with its direction flipped.
    pub fn inverse(self) -> Self {
        match self {
            Self::Matrix(mut t) => {
                t.direction = t.direction.invert();
                Self::Matrix(t)
            }
            Self::Exponent(mut t) => {
                t.direction = t.direction.invert();
                Self::Exponent(t)
            }
            Self::Log(mut t) => {
                t.direction = t.direction.invert();
                Self::Log(t)
            }
            Self::Range(mut t) => {
                t.direction = t.direction.invert();
                Self::Range(t)
            }
            Self::Cdl(mut t) => {
                t.direction = t.direction.invert();
                Self::Cdl(t)
            }
            Self::FixedFunction(mut t) => {
                t.direction = t.direction.invert();
                Self::FixedFunction(t)
            }
            Self::File(mut t) => {
                t.direction = t.direction.invert();
                Self::File(t)
            }
            Self::Look(mut t) => {
                t.direction = t.direction.invert();
                Self::Look(t)
            }
            Self::Group(mut t) => {
                t.direction = t.direction.invert();
                Self::Group(t)
            }
        }
    }
}

/// 4x4 matrix plus RGBA offset.
#[derive(Debug, Clone)]
pub struct MatrixTransform {
    /// Row-major 4x4 matrix.
    pub matrix: [f64; 16],
    /// Post-matrix offset per channel.
    pub offset: [f64; 4],
    /// Application direction.
    pub direction: Direction,
}

/// Handling of negative inputs for [`ExponentTransform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NegativeStyle {
    /// Clamp negatives to zero before the power.
    #[default]
    Clamp,
    /// `sign(x) * |x|^g`.
    Mirror,
    /// Pass non-positive values through unchanged.
    PassThru,
}

/// Per-channel exponent curve.
#[derive(Debug, Clone)]
pub struct ExponentTransform {
    /// Exponents in R, G, B, A order.
    pub value: [f64; 4],
    /// Negative-input handling.
    pub negative_style: NegativeStyle,
    /// Application direction.
    pub direction: Direction,
}

impl ExponentTransform {
    /// A uniform RGB exponent with unit alpha.
    pub fn new(gamma: f64) -> Self {
        Self {
            value: [gamma, gamma, gamma, 1.0],
            negative_style: NegativeStyle::default(),
            direction: Direction::Forward,
        }
    }
}

/// Plain logarithm curve of a given base.
#[derive(Debug, Clone)]
pub struct LogTransform {
    /// Logarithm base; must be positive and not 1.
    pub base: f64,
    /// Forward is lin -> log.
    pub direction: Direction,
}

/// Range remap; `None` bounds leave that side open.
#[derive(Debug, Clone, Default)]
pub struct RangeTransform {
    /// Input lower bound.
    pub min_in: Option<f64>,
    /// Input upper bound.
    pub max_in: Option<f64>,
    /// Output lower bound.
    pub min_out: Option<f64>,
    /// Output upper bound.
    pub max_out: Option<f64>,
    /// Clamp at the bounds or scale only.
    pub clamp: bool,
    /// Application direction.
    pub direction: Direction,
}

/// ASC CDL slope/offset/power/saturation grade.
#[derive(Debug, Clone)]
pub struct CdlTransform {
    /// Per-channel slope.
    pub slope: [f64; 3],
    /// Per-channel offset.
    pub offset: [f64; 3],
    /// Per-channel power.
    pub power: [f64; 3],
    /// Saturation, 1 is neutral.
    pub saturation: f64,
    /// Clamp per ASC CDL v1.2 or run unclamped.
    pub clamp: bool,
    /// Application direction.
    pub direction: Direction,
}

impl Default for CdlTransform {
    fn default() -> Self {
        Self {
            slope: [1.0; 3],
            offset: [0.0; 3],
            power: [1.0; 3],
            saturation: 1.0,
            clamp: true,
            direction: Direction::Forward,
        }
    }
}

/// Named fixed function with optional parameters.
#[derive(Debug, Clone)]
pub struct FixedFunctionTransform {
    /// Forward-direction style; the direction field flips it.
    pub style: ocre_ops::fixed_function::FixedFunctionStyle,
    /// Style-specific parameters.
    pub params: Vec<f64>,
    /// Application direction.
    pub direction: Direction,
}

/// A LUT, matrix, or CDL read from disk through the format registry.
#[derive(Debug, Clone)]
pub struct FileTransform {
    /// Path to the file.
    pub src: PathBuf,
    /// Correction id for `.ccc`/`.cdl` collections.
    pub cccid: Option<String>,
    /// Interpolation for LUT payloads.
    pub interpolation: Interpolation,
    /// Application direction.
    pub direction: Direction,
}

/// Looks selected by a look expression.
///
/// The source and destination color spaces are carried for the caller; the
/// builder lowers only the look chain itself. `skip_color_space` asks outer
/// layers to omit the src -> process-space conversion.
#[derive(Debug, Clone)]
pub struct LookTransform {
    /// Source color space name.
    pub src: String,
    /// Destination color space name.
    pub dst: String,
    /// Look expression (`+a, -b | +fallback` grammar).
    pub looks: String,
    /// Skip the color-space legs around the looks.
    pub skip_color_space: bool,
    /// Application direction.
    pub direction: Direction,
}

/// Ordered children applied under one direction.
#[derive(Debug, Clone)]
pub struct GroupTransform {
    /// Children in forward application order.
    pub children: Vec<Transform>,
    /// Application direction.
    pub direction: Direction,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_matrix() -> [f64; 16] {
        let mut m = [0.0; 16];
        for i in 0..4 {
            m[i * 4 + i] = 1.0;
        }
        m
    }

    #[test]
    fn inverse_flips_direction() {
        let t = Transform::matrix(identity_matrix());
        let inv = t.inverse();
        match inv {
            Transform::Matrix(m) => assert_eq!(m.direction, Direction::Inverse),
            other => panic!("expected matrix, got {other:?}"),
        }
    }

    #[test]
    fn double_inverse_is_forward() {
        let t = Transform::file("grade.cube").inverse().inverse();
        match t {
            Transform::File(f) => assert_eq!(f.direction, Direction::Forward),
            other => panic!("expected file, got {other:?}"),
        }
    }
}
