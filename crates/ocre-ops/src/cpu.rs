//! CPU kernel dispatch.
//!
//! Reference: OCIO CPUProcessor.cpp (op -> renderer selection)
//!
//! A [`CpuKernel`] is the prepared, f32 form of one op. Building one
//! resolves direction, bakes render constants, and picks the fastest
//! evaluation path the op allows. Kernels process packed RGBA scanlines.

use ocre_core::BitDepth;

use crate::cdl::CdlKernel;
use crate::error::OpResult;
use crate::fixed_function::FixedFunctionKernel;
use crate::gamma::GammaKernel;
use crate::grading_primary::GradingPrimaryKernel;
use crate::log::LogKernel;
use crate::lut1d::Lut1dKernel;
use crate::lut3d::Lut3dKernel;
use crate::matrix::MatrixKernel;
use crate::op::{Op, OpData};
use crate::range::RangeKernel;

/// Prepared renderer for one op.
#[derive(Debug, Clone)]
pub enum CpuKernel {
    Matrix(MatrixKernel),
    Range(RangeKernel),
    Gamma(GammaKernel),
    Log(LogKernel),
    Cdl(CdlKernel),
    FixedFunction(FixedFunctionKernel),
    GradingPrimary(GradingPrimaryKernel),
    Lut1d(Lut1dKernel),
    Lut3d(Lut3dKernel),
}

impl CpuKernel {
    /// Builds the renderer for `op`, assuming float input.
    pub fn new(op: &Op) -> OpResult<Self> {
        Ok(match &op.data {
            OpData::Matrix(d) => CpuKernel::Matrix(MatrixKernel::new(d)?),
            OpData::Range(d) => CpuKernel::Range(RangeKernel::new(d)),
            OpData::Gamma(d) => CpuKernel::Gamma(GammaKernel::new(d)),
            OpData::Log(d) => CpuKernel::Log(LogKernel::new(d)),
            OpData::Cdl(d) => CpuKernel::Cdl(CdlKernel::new(d)),
            OpData::FixedFunction(d) => CpuKernel::FixedFunction(FixedFunctionKernel::new(d)),
            OpData::GradingPrimary(d) => CpuKernel::GradingPrimary(GradingPrimaryKernel::new(d)),
            OpData::Lut1d(d) => CpuKernel::Lut1d(Lut1dKernel::new(d)?),
            OpData::Lut3d(d) => CpuKernel::Lut3d(Lut3dKernel::new(d)?),
        })
    }

    /// Builds the renderer for `op` when it is the first in the chain and
    /// the source image has integer depth `in_depth`. A forward 1D LUT then
    /// uses a precomputed per-code lookup table instead of interpolating.
    pub fn with_input_depth(op: &Op, in_depth: BitDepth) -> OpResult<Self> {
        match &op.data {
            OpData::Lut1d(d) => Ok(CpuKernel::Lut1d(Lut1dKernel::with_input_depth(d, in_depth)?)),
            _ => Self::new(op),
        }
    }

    /// Transforms packed RGBA pixels in place.
    pub fn apply_rgba(&self, pixels: &mut [f32]) {
        match self {
            CpuKernel::Matrix(k) => k.apply_rgba(pixels),
            CpuKernel::Range(k) => k.apply_rgba(pixels),
            CpuKernel::Gamma(k) => k.apply_rgba(pixels),
            CpuKernel::Log(k) => k.apply_rgba(pixels),
            CpuKernel::Cdl(k) => k.apply_rgba(pixels),
            CpuKernel::FixedFunction(k) => k.apply_rgba(pixels),
            CpuKernel::GradingPrimary(k) => k.apply_rgba(pixels),
            CpuKernel::Lut1d(k) => k.apply_rgba(pixels),
            CpuKernel::Lut3d(k) => k.apply_rgba(pixels),
        }
    }
}
