//! Log op: per-channel lin <-> log with an affine on both sides.
//!
//! Reference: OCIO ops/log/LogOpData.cpp, LogOpCPU.cpp
//!
//! Forward (lin -> log):
//!
//! ```text
//! y = logSideSlope * log_base(linSideSlope * x + linSideOffset) + logSideOffset
//! ```
//!
//! A non-positive log argument is clamped to the smallest positive float, so
//! the forward op returns a large negative limit rather than NaN. The reverse
//! direction inverts algebraically. Alpha is untouched.

use crate::error::{OpError, OpResult};
use crate::metadata::FormatMetadata;
use crate::op::Direction;

/// Per-channel log parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogParams {
    /// Slope on the log side.
    pub log_slope: f64,
    /// Offset on the log side.
    pub log_offset: f64,
    /// Slope on the linear side.
    pub lin_slope: f64,
    /// Offset on the linear side.
    pub lin_offset: f64,
}

impl Default for LogParams {
    fn default() -> Self {
        Self {
            log_slope: 1.0,
            log_offset: 0.0,
            lin_slope: 1.0,
            lin_offset: 0.0,
        }
    }
}

/// Log op parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LogOpData {
    /// Logarithm base; must be positive and not 1.
    pub base: f64,
    /// Parameters in R, G, B order.
    pub params: [LogParams; 3],
    /// Forward is lin -> log.
    pub direction: Direction,
    /// Opaque metadata for file-format round trips.
    pub metadata: FormatMetadata,
}

impl LogOpData {
    /// A plain logarithm of the given base (unit slopes, zero offsets).
    pub fn with_base(base: f64, direction: Direction) -> Self {
        Self {
            base,
            params: [LogParams::default(); 3],
            direction,
            metadata: FormatMetadata::new(),
        }
    }

    /// Full parameter constructor, same parameters on all channels.
    pub fn new(base: f64, params: LogParams, direction: Direction) -> Self {
        Self {
            base,
            params: [params; 3],
            direction,
            metadata: FormatMetadata::new(),
        }
    }

    /// Checks base and slope constraints.
    pub fn validate(&self) -> OpResult<()> {
        if self.base <= 0.0 {
            return Err(OpError::structural(
                "Log",
                format!("base {} must be positive", self.base),
            ));
        }
        if (self.base - 1.0).abs() < 1e-9 {
            return Err(OpError::structural("Log", "base cannot be 1"));
        }
        for p in &self.params {
            if p.log_slope == 0.0 {
                return Err(OpError::structural("Log", "log-side slope cannot be 0"));
            }
            if p.lin_slope == 0.0 {
                return Err(OpError::structural("Log", "linear-side slope cannot be 0"));
            }
        }
        Ok(())
    }

    /// A log curve is never the identity; identity only arises from an
    /// inverse pair, which the optimizer detects via [`Self::is_inverse_of`].
    pub fn is_identity(&self) -> bool {
        false
    }

    /// True when applying `self` then `other` cancels exactly.
    pub fn is_inverse_of(&self, other: &Self) -> bool {
        self.base == other.base
            && self.params == other.params
            && self.direction == other.direction.invert()
    }

    /// The inverse op (same parameters, opposite direction).
    pub fn inverse(&self) -> Self {
        Self {
            direction: self.direction.invert(),
            ..self.clone()
        }
    }

    /// Canonical id: every numeric parameter participates.
    pub fn cache_id(&self) -> String {
        let p: Vec<String> = self
            .params
            .iter()
            .map(|p| {
                format!(
                    "{:?}/{:?}/{:?}/{:?}",
                    p.log_slope, p.log_offset, p.lin_slope, p.lin_offset
                )
            })
            .collect();
        format!(
            "Log base={:?} params=[{}] dir={}",
            self.base,
            p.join(","),
            self.direction
        )
    }
}

// ============================================================================
// CPU kernel
// ============================================================================

/// Render constants for one channel.
#[derive(Debug, Clone, Copy)]
struct LogChannel {
    log_slope: f32,
    log_offset: f32,
    lin_slope: f32,
    lin_offset: f32,
    /// 1 / ln(base), folded into the forward evaluation.
    inv_ln_base: f32,
    /// ln(base), folded into the reverse evaluation.
    ln_base: f32,
}

/// Prepared log kernel over packed RGBA f32 pixels.
#[derive(Debug, Clone)]
pub struct LogKernel {
    channels: [LogChannel; 3],
    forward: bool,
}

impl LogKernel {
    /// Captures f32 render constants.
    pub fn new(data: &LogOpData) -> Self {
        let ln_base = data.base.ln();
        let make = |p: &LogParams| LogChannel {
            log_slope: p.log_slope as f32,
            log_offset: p.log_offset as f32,
            lin_slope: p.lin_slope as f32,
            lin_offset: p.lin_offset as f32,
            inv_ln_base: (1.0 / ln_base) as f32,
            ln_base: ln_base as f32,
        };
        Self {
            channels: [make(&data.params[0]), make(&data.params[1]), make(&data.params[2])],
            forward: data.direction == Direction::Forward,
        }
    }

    /// Applies to a packed RGBA buffer in place. Alpha passes through.
    pub fn apply_rgba(&self, pixels: &mut [f32]) {
        debug_assert!(pixels.len() % 4 == 0);
        for chunk in pixels.chunks_exact_mut(4) {
            for (c, p) in chunk[..3].iter_mut().zip(self.channels.iter()) {
                *c = if self.forward {
                    // Clamp the argument so non-positive inputs hit the
                    // large-negative limit instead of NaN.
                    let arg = (p.lin_slope * *c + p.lin_offset).max(f32::MIN_POSITIVE);
                    p.log_slope * (arg.ln() * p.inv_ln_base) + p.log_offset
                } else {
                    let e = (*c - p.log_offset) / p.log_slope;
                    ((e * p.ln_base).exp() - p.lin_offset) / p.lin_slope
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base10_round_trip() {
        let fwd = LogOpData::with_base(10.0, Direction::Forward);
        let rev = fwd.inverse();
        let kf = LogKernel::new(&fwd);
        let kr = LogKernel::new(&rev);

        let mut pixels = [0.18, 0.5, 1.0, 1.0];
        kf.apply_rgba(&mut pixels);
        kr.apply_rgba(&mut pixels);
        assert!((pixels[0] - 0.18).abs() < 1e-6);
        assert!((pixels[1] - 0.5).abs() < 1e-6);
        assert!((pixels[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn forward_values_base2() {
        let fwd = LogOpData::with_base(2.0, Direction::Forward);
        let k = LogKernel::new(&fwd);

        let mut pixels = [0.5, 1.0, 4.0, 1.0];
        k.apply_rgba(&mut pixels);
        assert!((pixels[0] + 1.0).abs() < 1e-6);
        assert!(pixels[1].abs() < 1e-6);
        assert!((pixels[2] - 2.0).abs() < 1e-6);
        assert_eq!(pixels[3], 1.0);
    }

    #[test]
    fn non_positive_argument_hits_limit() {
        let fwd = LogOpData::with_base(10.0, Direction::Forward);
        let k = LogKernel::new(&fwd);

        let mut pixels = [0.0, -1.0, 1.0, 1.0];
        k.apply_rgba(&mut pixels);
        assert!(pixels[0].is_finite());
        assert!(pixels[0] < -30.0); // log10 of the smallest positive float
        assert_eq!(pixels[0], pixels[1]);
    }

    #[test]
    fn base_one_rejected() {
        let bad = LogOpData::with_base(1.0, Direction::Forward);
        assert!(bad.validate().is_err());

        let neg = LogOpData::with_base(-2.0, Direction::Forward);
        assert!(neg.validate().is_err());
    }

    #[test]
    fn inverse_pair_detected() {
        let fwd = LogOpData::with_base(10.0, Direction::Forward);
        let rev = fwd.inverse();
        assert!(fwd.is_inverse_of(&rev));
        assert!(rev.is_inverse_of(&fwd));

        let other = LogOpData::with_base(2.0, Direction::Inverse);
        assert!(!fwd.is_inverse_of(&other));
    }

    #[test]
    fn affine_parameters_round_trip() {
        // Cineon-style parameters.
        let params = LogParams {
            log_slope: 0.256,
            log_offset: 0.685,
            lin_slope: 5.26,
            lin_offset: 0.0522,
        };
        let fwd = LogOpData::new(10.0, params, Direction::Forward);
        let kf = LogKernel::new(&fwd);
        let kr = LogKernel::new(&fwd.inverse());

        let mut pixels = [0.18, 0.02, 0.9, 1.0];
        kf.apply_rgba(&mut pixels);
        kr.apply_rgba(&mut pixels);
        assert!((pixels[0] - 0.18).abs() < 1e-5);
        assert!((pixels[1] - 0.02).abs() < 1e-5);
        assert!((pixels[2] - 0.9).abs() < 1e-5);
    }
}
