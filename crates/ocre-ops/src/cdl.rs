//! ASC CDL op: slope, offset, power, saturation.
//!
//! Reference: OCIO ops/cdl/CDLOpData.cpp, CDLOpCPU.cpp
//!
//! The V1.2 styles clamp to [0,1] around the power stage and after
//! saturation, per the ASC specification. The NoClamp styles omit every clamp
//! and extend `pow` to negatives as `sign(x) * |x|^p`. Saturation uses the
//! Rec.709 luma weights and is the only source of channel crosstalk.

use ocre_core::REC709_LUMA;

use crate::error::{OpError, OpResult};
use crate::metadata::FormatMetadata;

/// CDL style, direction included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CdlStyle {
    /// ASC CDL v1.2 with clamping, forward.
    V12Fwd,
    /// ASC CDL v1.2 with clamping, reverse.
    V12Rev,
    /// No clamping, forward.
    NoClampFwd,
    /// No clamping, reverse.
    NoClampRev,
}

impl CdlStyle {
    /// True for the clamping styles.
    pub fn clamps(self) -> bool {
        matches!(self, Self::V12Fwd | Self::V12Rev)
    }

    /// True for forward styles.
    pub fn is_forward(self) -> bool {
        matches!(self, Self::V12Fwd | Self::NoClampFwd)
    }

    /// The same style with the opposite direction.
    pub fn inverse(self) -> Self {
        match self {
            Self::V12Fwd => Self::V12Rev,
            Self::V12Rev => Self::V12Fwd,
            Self::NoClampFwd => Self::NoClampRev,
            Self::NoClampRev => Self::NoClampFwd,
        }
    }

    /// Parses the canonical style token.
    pub fn from_str(s: &str) -> OpResult<Self> {
        Ok(match s {
            "v1.2_Fwd" => Self::V12Fwd,
            "v1.2_Rev" => Self::V12Rev,
            "noClampFwd" => Self::NoClampFwd,
            "noClampRev" => Self::NoClampRev,
            other => {
                return Err(OpError::UnknownEnum {
                    what: "CDL style",
                    value: other.to_string(),
                })
            }
        })
    }
}

/// CDL op parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CdlOpData {
    /// Per-channel slope; must be positive.
    pub slope: [f64; 3],
    /// Per-channel offset.
    pub offset: [f64; 3],
    /// Per-channel power; must be positive.
    pub power: [f64; 3],
    /// Saturation; must be positive.
    pub saturation: f64,
    /// Style (direction folded in).
    pub style: CdlStyle,
    /// Opaque metadata for file-format round trips.
    pub metadata: FormatMetadata,
}

impl Default for CdlOpData {
    fn default() -> Self {
        Self {
            slope: [1.0; 3],
            offset: [0.0; 3],
            power: [1.0; 3],
            saturation: 1.0,
            style: CdlStyle::V12Fwd,
            metadata: FormatMetadata::new(),
        }
    }
}

impl CdlOpData {
    /// Full parameter constructor.
    pub fn new(slope: [f64; 3], offset: [f64; 3], power: [f64; 3], saturation: f64) -> Self {
        Self {
            slope,
            offset,
            power,
            saturation,
            ..Self::default()
        }
    }

    /// Rejects non-positive slope, power, or saturation.
    pub fn validate(&self) -> OpResult<()> {
        for (i, s) in self.slope.iter().enumerate() {
            if *s <= 0.0 {
                return Err(OpError::structural(
                    "CDL",
                    format!("slope[{i}] is {s}, must be positive"),
                ));
            }
        }
        for (i, p) in self.power.iter().enumerate() {
            if *p <= 0.0 {
                return Err(OpError::structural(
                    "CDL",
                    format!("power[{i}] is {p}, must be positive"),
                ));
            }
        }
        if self.saturation <= 0.0 {
            return Err(OpError::structural(
                "CDL",
                format!("saturation is {}, must be positive", self.saturation),
            ));
        }
        Ok(())
    }

    /// True when all parameters are at their neutral values.
    pub fn is_identity(&self) -> bool {
        self.slope == [1.0; 3]
            && self.offset == [0.0; 3]
            && self.power == [1.0; 3]
            && self.saturation == 1.0
    }

    /// Channels interact only through the saturation stage.
    pub fn has_channel_crosstalk(&self) -> bool {
        self.saturation != 1.0
    }

    /// The inverse op (same parameters, opposite direction).
    pub fn inverse(&self) -> Self {
        Self {
            style: self.style.inverse(),
            ..self.clone()
        }
    }

    /// Composes two no-clamp CDLs when both reduce to slope/offset only.
    pub fn compose_affine(&self, second: &Self) -> Option<Self> {
        let affine = |d: &Self| {
            d.style == CdlStyle::NoClampFwd && d.power == [1.0; 3] && d.saturation == 1.0
        };
        if !affine(self) || !affine(second) {
            return None;
        }
        let mut slope = [0.0; 3];
        let mut offset = [0.0; 3];
        for i in 0..3 {
            slope[i] = self.slope[i] * second.slope[i];
            offset[i] = self.offset[i] * second.slope[i] + second.offset[i];
        }
        let mut composed = Self::new(slope, offset, [1.0; 3], 1.0);
        composed.style = CdlStyle::NoClampFwd;
        Some(composed)
    }

    /// True when applying `self` then `other` cancels exactly.
    pub fn is_inverse_of(&self, other: &Self) -> bool {
        self.slope == other.slope
            && self.offset == other.offset
            && self.power == other.power
            && self.saturation == other.saturation
            && self.style == other.style.inverse()
    }

    /// Canonical id: every numeric parameter participates.
    pub fn cache_id(&self) -> String {
        format!(
            "CDL s={:?} o={:?} p={:?} sat={:?} style={:?}",
            self.slope, self.offset, self.power, self.saturation, self.style
        )
    }
}

// ============================================================================
// CPU kernel
// ============================================================================

/// Prepared CDL kernel over packed RGBA f32 pixels.
#[derive(Debug, Clone)]
pub struct CdlKernel {
    slope: [f32; 3],
    offset: [f32; 3],
    power: [f32; 3],
    saturation: f32,
    style: CdlStyle,
}

impl CdlKernel {
    /// Captures f32 render constants.
    pub fn new(data: &CdlOpData) -> Self {
        Self {
            slope: data.slope.map(|v| v as f32),
            offset: data.offset.map(|v| v as f32),
            power: data.power.map(|v| v as f32),
            saturation: data.saturation as f32,
            style: data.style,
        }
    }

    /// Applies to a packed RGBA buffer in place. Alpha passes through.
    pub fn apply_rgba(&self, pixels: &mut [f32]) {
        debug_assert!(pixels.len() % 4 == 0);
        for chunk in pixels.chunks_exact_mut(4) {
            let mut rgb = [chunk[0], chunk[1], chunk[2]];
            match self.style {
                CdlStyle::V12Fwd => {
                    for i in 0..3 {
                        let v = clamp01(rgb[i] * self.slope[i] + self.offset[i]);
                        rgb[i] = v.powf(self.power[i]);
                    }
                    self.saturate(&mut rgb, self.saturation);
                    for v in &mut rgb {
                        *v = clamp01(*v);
                    }
                }
                CdlStyle::NoClampFwd => {
                    for i in 0..3 {
                        let v = rgb[i] * self.slope[i] + self.offset[i];
                        rgb[i] = pow_mirror(v, self.power[i]);
                    }
                    self.saturate(&mut rgb, self.saturation);
                }
                CdlStyle::V12Rev => {
                    for v in &mut rgb {
                        *v = clamp01(*v);
                    }
                    self.saturate(&mut rgb, 1.0 / self.saturation);
                    for i in 0..3 {
                        let v = clamp01(rgb[i]);
                        let v = v.powf(1.0 / self.power[i]);
                        rgb[i] = clamp01((v - self.offset[i]) / self.slope[i]);
                    }
                }
                CdlStyle::NoClampRev => {
                    self.saturate(&mut rgb, 1.0 / self.saturation);
                    for i in 0..3 {
                        let v = pow_mirror(rgb[i], 1.0 / self.power[i]);
                        rgb[i] = (v - self.offset[i]) / self.slope[i];
                    }
                }
            }
            chunk[0] = rgb[0];
            chunk[1] = rgb[1];
            chunk[2] = rgb[2];
        }
    }

    #[inline]
    fn saturate(&self, rgb: &mut [f32; 3], sat: f32) {
        if sat != 1.0 {
            let luma = rgb[0] * REC709_LUMA[0] + rgb[1] * REC709_LUMA[1] + rgb[2] * REC709_LUMA[2];
            for v in rgb.iter_mut() {
                *v = luma + sat * (*v - luma);
            }
        }
    }
}

#[inline]
fn clamp01(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

/// `sign(x) * |x|^p`, the no-clamp extension of pow to negatives.
#[inline]
fn pow_mirror(v: f32, p: f32) -> f32 {
    v.abs().powf(p).copysign(v)
}
