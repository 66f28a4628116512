//! Range op for clamping and affine remapping.
//!
//! Reference: OCIO ops/range/RangeOpData.cpp, RangeOpCPU.cpp
//!
//! A Range either clamps to [min, max] (in-range equals out-range) or applies
//! a scale and offset with clamping at the set boundaries. The min pair and
//! the max pair must each be set together or not at all; a missing pair means
//! unbounded on that side.

use crate::error::{OpError, OpResult};
use crate::matrix::MatrixOpData;
use crate::metadata::FormatMetadata;
use crate::op::Direction;

/// Clamping behavior of a Range.
///
/// `NoClamp` is a pure scale and offset; it is representable as a Matrix and
/// the optimizer folds it into adjacent matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeStyle {
    /// Clamp at the set boundaries (the default).
    Clamp,
    /// Affine remap only; requires all four bounds to define the mapping.
    NoClamp,
}

/// Range op parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeOpData {
    /// Minimum input value (None = unbounded below).
    pub min_in: Option<f64>,
    /// Maximum input value (None = unbounded above).
    pub max_in: Option<f64>,
    /// Minimum output value.
    pub min_out: Option<f64>,
    /// Maximum output value.
    pub max_out: Option<f64>,
    /// Clamp or pure affine.
    pub style: RangeStyle,
    /// Forward remaps in -> out; inverse swaps the roles.
    pub direction: Direction,
    /// Opaque metadata for file-format round trips.
    pub metadata: FormatMetadata,
}

impl Default for RangeOpData {
    fn default() -> Self {
        Self::clamp(0.0, 1.0)
    }
}

impl RangeOpData {
    /// Full remap from [min_in, max_in] to [min_out, max_out] with clamping.
    pub fn new(min_in: f64, max_in: f64, min_out: f64, max_out: f64) -> Self {
        Self {
            min_in: Some(min_in),
            max_in: Some(max_in),
            min_out: Some(min_out),
            max_out: Some(max_out),
            style: RangeStyle::Clamp,
            direction: Direction::Forward,
            metadata: FormatMetadata::new(),
        }
    }

    /// A clamp to [min, max] with no scaling.
    pub fn clamp(min: f64, max: f64) -> Self {
        Self::new(min, max, min, max)
    }

    /// Clamp below only.
    pub fn clamp_min(min: f64) -> Self {
        Self {
            min_in: Some(min),
            max_in: None,
            min_out: Some(min),
            max_out: None,
            style: RangeStyle::Clamp,
            direction: Direction::Forward,
            metadata: FormatMetadata::new(),
        }
    }

    /// Clamp above only.
    pub fn clamp_max(max: f64) -> Self {
        Self {
            min_in: None,
            max_in: Some(max),
            min_out: None,
            max_out: Some(max),
            style: RangeStyle::Clamp,
            direction: Direction::Forward,
            metadata: FormatMetadata::new(),
        }
    }

    /// True when the in-range differs from the out-range (affine remap).
    pub fn scales(&self) -> bool {
        match (self.min_in, self.max_in, self.min_out, self.max_out) {
            (Some(min_in), Some(max_in), Some(min_out), Some(max_out)) => {
                let in_range = max_in - min_in;
                let out_range = max_out - min_out;
                (in_range - out_range).abs() > 1e-12 || (min_in - min_out).abs() > 1e-12
            }
            _ => false,
        }
    }

    /// Scale factor of the affine part.
    pub fn scale(&self) -> f64 {
        match (self.min_in, self.max_in, self.min_out, self.max_out) {
            (Some(min_in), Some(max_in), Some(min_out), Some(max_out)) => {
                let in_range = max_in - min_in;
                if in_range.abs() < 1e-12 {
                    1.0
                } else {
                    (max_out - min_out) / in_range
                }
            }
            _ => 1.0,
        }
    }

    /// Offset of the affine part.
    pub fn offset(&self) -> f64 {
        match (self.min_in, self.min_out) {
            (Some(min_in), Some(min_out)) => min_out - min_in * self.scale(),
            _ => 0.0,
        }
    }

    /// Lower output bound, `-inf` when unbounded.
    pub fn lower_bound(&self) -> f64 {
        self.min_out.unwrap_or(f64::NEG_INFINITY)
    }

    /// Upper output bound, `+inf` when unbounded.
    pub fn upper_bound(&self) -> f64 {
        self.max_out.unwrap_or(f64::INFINITY)
    }

    /// Checks the pairing and ordering rules.
    pub fn validate(&self) -> OpResult<()> {
        if self.min_in.is_some() != self.min_out.is_some() {
            return Err(OpError::structural(
                "Range",
                "min input and min output must both be set or both unset",
            ));
        }
        if self.max_in.is_some() != self.max_out.is_some() {
            return Err(OpError::structural(
                "Range",
                "max input and max output must both be set or both unset",
            ));
        }
        if let (Some(lo), Some(hi)) = (self.min_in, self.max_in) {
            if lo >= hi {
                return Err(OpError::structural(
                    "Range",
                    format!("min input {lo} must be less than max input {hi}"),
                ));
            }
        }
        if let (Some(lo), Some(hi)) = (self.min_out, self.max_out) {
            if lo >= hi {
                return Err(OpError::structural(
                    "Range",
                    format!("min output {lo} must be less than max output {hi}"),
                ));
            }
        }
        if self.style == RangeStyle::NoClamp
            && (self.min_in.is_none() || self.max_in.is_none())
        {
            return Err(OpError::structural(
                "Range",
                "no-clamp style requires all four bounds",
            ));
        }
        Ok(())
    }

    /// True when the op cannot change any sample: no bounds at all, or a
    /// non-clamping remap with unit scale and zero offset.
    pub fn is_identity(&self) -> bool {
        match self.style {
            RangeStyle::Clamp => {
                self.min_in.is_none()
                    && self.max_in.is_none()
                    && self.min_out.is_none()
                    && self.max_out.is_none()
            }
            RangeStyle::NoClamp => {
                (self.scale() - 1.0).abs() < 1e-12 && self.offset().abs() < 1e-12
            }
        }
    }

    /// Inverse swaps the in and out ranges.
    pub fn inverse(&self) -> Self {
        Self {
            min_in: self.min_out,
            max_in: self.max_out,
            min_out: self.min_in,
            max_out: self.max_in,
            style: self.style,
            direction: Direction::Forward,
            metadata: self.metadata.clone(),
        }
    }

    /// Resolves the direction flag into forward parameters.
    pub fn resolved(&self) -> Self {
        match self.direction {
            Direction::Forward => self.clone(),
            Direction::Inverse => self.inverse(),
        }
    }

    /// Composition: applies `self` first, then `second`.
    ///
    /// The in-domains intersect (the second op's bounds pulled back through
    /// the first op's affine), the affine parts compose, and the out-bounds
    /// are the intersected in-bounds pushed through the composed affine,
    /// clamped to the second op's out-bounds. A disjoint intersection yields
    /// an op that fails [`Self::validate`]; callers must treat that pair as
    /// not combinable.
    pub fn compose(&self, second: &Self) -> Self {
        let s1 = self.scale();
        let o1 = self.offset();
        let scale = s1 * second.scale();
        let offset = o1 * second.scale() + second.offset();

        let style = if self.style == RangeStyle::NoClamp && second.style == RangeStyle::NoClamp {
            RangeStyle::NoClamp
        } else {
            RangeStyle::Clamp
        };

        // Validation keeps both in and out ranges ascending, so scales are
        // positive and pulling a middle-domain bound back preserves order.
        let back = |x: f64| (x - o1) / s1;
        let (min_in, max_in) = if style == RangeStyle::NoClamp {
            (self.min_in, self.max_in)
        } else {
            let first = |b: Option<f64>| b.filter(|_| self.style == RangeStyle::Clamp);
            let second_in = |b: Option<f64>| {
                b.filter(|_| second.style == RangeStyle::Clamp).map(back)
            };
            (
                tighter_lower(first(self.min_in), second_in(second.min_in)),
                tighter_upper(first(self.max_in), second_in(second.max_in)),
            )
        };

        let clamp_out = |v: f64| {
            if second.style == RangeStyle::Clamp {
                let v = second.min_out.map_or(v, |lo| v.max(lo));
                second.max_out.map_or(v, |hi| v.min(hi))
            } else {
                v
            }
        };
        let fwd = |v: Option<f64>| v.map(|x| clamp_out(x * scale + offset));

        Self {
            min_in,
            max_in,
            min_out: fwd(min_in),
            max_out: fwd(max_in),
            style,
            direction: Direction::Forward,
            metadata: FormatMetadata::new(),
        }
    }

    /// The equivalent Matrix, available only for the no-clamp style.
    pub fn as_matrix(&self) -> Option<MatrixOpData> {
        if self.style != RangeStyle::NoClamp {
            return None;
        }
        let s = self.scale();
        let o = self.offset();
        let mut m = MatrixOpData::from_scale([s, s, s, 1.0]);
        m.offset = [o, o, o, 0.0];
        Some(m)
    }

    /// Canonical id: every numeric parameter participates.
    pub fn cache_id(&self) -> String {
        format!(
            "Range in=[{:?},{:?}] out=[{:?},{:?}] style={:?} dir={}",
            self.min_in, self.max_in, self.min_out, self.max_out, self.style, self.direction
        )
    }
}

/// The tighter of two optional lower bounds.
fn tighter_lower(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// The tighter of two optional upper bounds.
fn tighter_upper(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

// ============================================================================
// CPU kernel
// ============================================================================

/// Kernel shape selected from the bound pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
enum RangeKernelMode {
    /// Clamp both sides, no scaling.
    MinMax,
    /// Scale and offset, then clamp both sides.
    ScaleMinMax,
    /// Clamp below only.
    MinOnly,
    /// Clamp above only.
    MaxOnly,
    /// Scale and offset without clamping (no-clamp style).
    ScaleOnly,
    /// Nothing to do.
    Noop,
}

/// Prepared range kernel over packed RGBA f32 pixels.
#[derive(Debug, Clone)]
pub struct RangeKernel {
    mode: RangeKernelMode,
    scale: f32,
    offset: f32,
    lower: f32,
    upper: f32,
}

impl RangeKernel {
    /// Resolves direction and captures f32 parameters.
    pub fn new(data: &RangeOpData) -> Self {
        let fwd = data.resolved();
        let mode = if fwd.style == RangeStyle::NoClamp {
            RangeKernelMode::ScaleOnly
        } else if fwd.is_identity() {
            RangeKernelMode::Noop
        } else if fwd.scales() {
            RangeKernelMode::ScaleMinMax
        } else if fwd.min_out.is_some() && fwd.max_out.is_some() {
            RangeKernelMode::MinMax
        } else if fwd.min_out.is_some() {
            RangeKernelMode::MinOnly
        } else {
            RangeKernelMode::MaxOnly
        };
        Self {
            mode,
            scale: fwd.scale() as f32,
            offset: fwd.offset() as f32,
            lower: fwd.lower_bound() as f32,
            upper: fwd.upper_bound() as f32,
        }
    }

    /// Applies to a packed RGBA buffer in place. Alpha passes through,
    /// including NaN.
    pub fn apply_rgba(&self, pixels: &mut [f32]) {
        debug_assert!(pixels.len() % 4 == 0);
        for chunk in pixels.chunks_exact_mut(4) {
            match self.mode {
                RangeKernelMode::Noop => {}
                RangeKernelMode::MinMax => {
                    for c in &mut chunk[..3] {
                        *c = clamp_nan(*c, self.lower, self.upper);
                    }
                }
                RangeKernelMode::ScaleMinMax => {
                    for c in &mut chunk[..3] {
                        let v = *c * self.scale + self.offset;
                        *c = clamp_nan(v, self.lower, self.upper);
                    }
                }
                RangeKernelMode::MinOnly => {
                    for c in &mut chunk[..3] {
                        *c = if c.is_nan() { self.lower } else { c.max(self.lower) };
                    }
                }
                RangeKernelMode::MaxOnly => {
                    for c in &mut chunk[..3] {
                        *c = if c.is_nan() { self.upper } else { c.min(self.upper) };
                    }
                }
                RangeKernelMode::ScaleOnly => {
                    for c in &mut chunk[..3] {
                        *c = *c * self.scale + self.offset;
                    }
                }
            }
        }
    }
}

/// Clamp to [lower, upper], mapping NaN to the lower bound.
#[inline]
fn clamp_nan(v: f32, lower: f32, upper: f32) -> f32 {
    if v.is_nan() {
        lower
    } else if v < lower {
        lower
    } else if v > upper {
        upper
    } else {
        v
    }
}
