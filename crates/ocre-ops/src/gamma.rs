//! Gamma/exponent op.
//!
//! Reference: OCIO ops/gamma/GammaOpData.cpp, GammaOpCPU.cpp
//!
//! All variants compute per channel with no crosstalk, and unlike most ops
//! the alpha channel has its own parameter set. BASIC clamps the base at
//! zero, MIRROR reflects around the origin, PASS_THRU leaves non-positive
//! values untouched, and MONCURVE is a two-segment curve whose linear slope
//! and breakpoint are derived so value and derivative are continuous.

use crate::error::{OpError, OpResult};
use crate::metadata::FormatMetadata;

/// Gamma style, direction included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GammaStyle {
    /// `y = max(0, x)^g`.
    BasicFwd,
    /// `y = max(0, x)^(1/g)`.
    BasicRev,
    /// `y = sign(x) * |x|^g`.
    BasicMirrorFwd,
    /// `y = sign(x) * |x|^(1/g)`.
    BasicMirrorRev,
    /// `y = x^g` for x > 0, pass-through otherwise.
    BasicPassThruFwd,
    /// `y = x^(1/g)` for x > 0, pass-through otherwise.
    BasicPassThruRev,
    /// Linear segment below the breakpoint, power curve above.
    MoncurveFwd,
    /// Algebraic inverse of `MoncurveFwd`.
    MoncurveRev,
    /// `MoncurveFwd` mirrored around the origin.
    MoncurveMirrorFwd,
    /// `MoncurveRev` mirrored around the origin.
    MoncurveMirrorRev,
}

impl GammaStyle {
    /// True for the moncurve family.
    pub fn is_moncurve(self) -> bool {
        matches!(
            self,
            Self::MoncurveFwd | Self::MoncurveRev | Self::MoncurveMirrorFwd | Self::MoncurveMirrorRev
        )
    }

    /// True for forward styles.
    pub fn is_forward(self) -> bool {
        matches!(
            self,
            Self::BasicFwd
                | Self::BasicMirrorFwd
                | Self::BasicPassThruFwd
                | Self::MoncurveFwd
                | Self::MoncurveMirrorFwd
        )
    }

    /// The same style with the opposite direction.
    pub fn inverse(self) -> Self {
        match self {
            Self::BasicFwd => Self::BasicRev,
            Self::BasicRev => Self::BasicFwd,
            Self::BasicMirrorFwd => Self::BasicMirrorRev,
            Self::BasicMirrorRev => Self::BasicMirrorFwd,
            Self::BasicPassThruFwd => Self::BasicPassThruRev,
            Self::BasicPassThruRev => Self::BasicPassThruFwd,
            Self::MoncurveFwd => Self::MoncurveRev,
            Self::MoncurveRev => Self::MoncurveFwd,
            Self::MoncurveMirrorFwd => Self::MoncurveMirrorRev,
            Self::MoncurveMirrorRev => Self::MoncurveMirrorFwd,
        }
    }

    /// Parses the canonical style token.
    pub fn from_str(s: &str) -> OpResult<Self> {
        Ok(match s {
            "basicFwd" => Self::BasicFwd,
            "basicRev" => Self::BasicRev,
            "basicMirrorFwd" => Self::BasicMirrorFwd,
            "basicMirrorRev" => Self::BasicMirrorRev,
            "basicPassThruFwd" => Self::BasicPassThruFwd,
            "basicPassThruRev" => Self::BasicPassThruRev,
            "monCurveFwd" => Self::MoncurveFwd,
            "monCurveRev" => Self::MoncurveRev,
            "monCurveMirrorFwd" => Self::MoncurveMirrorFwd,
            "monCurveMirrorRev" => Self::MoncurveMirrorRev,
            other => {
                return Err(OpError::UnknownEnum {
                    what: "gamma style",
                    value: other.to_string(),
                })
            }
        })
    }
}

/// Per-channel gamma parameters. `offset` is meaningful for moncurve only.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GammaParams {
    /// The exponent.
    pub gamma: f64,
    /// Moncurve toe offset.
    pub offset: f64,
}

impl GammaParams {
    /// Basic parameters (no offset).
    pub fn basic(gamma: f64) -> Self {
        Self { gamma, offset: 0.0 }
    }

    /// Moncurve parameters.
    pub fn moncurve(gamma: f64, offset: f64) -> Self {
        Self { gamma, offset }
    }

    /// True when this channel is a no-op for its style.
    fn is_identity(&self, moncurve: bool) -> bool {
        self.gamma == 1.0 && (!moncurve || self.offset == 0.0)
    }
}

/// Validation bounds.
const BASIC_GAMMA_MIN: f64 = 0.01;
const BASIC_GAMMA_MAX: f64 = 100.0;
const MONCURVE_GAMMA_MIN: f64 = 1.0;
const MONCURVE_GAMMA_MAX: f64 = 10.0;
const MONCURVE_OFFSET_MIN: f64 = 0.0;
const MONCURVE_OFFSET_MAX: f64 = 0.9;

/// Gamma op parameters: style plus R, G, B, A parameter sets.
#[derive(Debug, Clone, PartialEq)]
pub struct GammaOpData {
    /// Style (direction folded in).
    pub style: GammaStyle,
    /// Parameters in R, G, B, A order.
    pub params: [GammaParams; 4],
    /// Opaque metadata for file-format round trips.
    pub metadata: FormatMetadata,
}

impl GammaOpData {
    /// A basic gamma with per-channel exponents.
    pub fn basic(style: GammaStyle, gamma: [f64; 4]) -> Self {
        Self {
            style,
            params: gamma.map(GammaParams::basic),
            metadata: FormatMetadata::new(),
        }
    }

    /// A moncurve gamma with per-channel exponents and offsets.
    pub fn moncurve(style: GammaStyle, gamma: [f64; 4], offset: [f64; 4]) -> Self {
        let mut params = [GammaParams::default(); 4];
        for i in 0..4 {
            params[i] = GammaParams::moncurve(gamma[i], offset[i]);
        }
        Self {
            style,
            params,
            metadata: FormatMetadata::new(),
        }
    }

    /// Checks the per-style parameter bounds.
    pub fn validate(&self) -> OpResult<()> {
        for p in &self.params {
            if self.style.is_moncurve() {
                if !(MONCURVE_GAMMA_MIN..=MONCURVE_GAMMA_MAX).contains(&p.gamma) {
                    return Err(OpError::ParamOutOfRange {
                        op: "Gamma",
                        param: "gamma",
                        value: p.gamma,
                        min: MONCURVE_GAMMA_MIN,
                        max: MONCURVE_GAMMA_MAX,
                    });
                }
                if !(MONCURVE_OFFSET_MIN..=MONCURVE_OFFSET_MAX).contains(&p.offset) {
                    return Err(OpError::ParamOutOfRange {
                        op: "Gamma",
                        param: "offset",
                        value: p.offset,
                        min: MONCURVE_OFFSET_MIN,
                        max: MONCURVE_OFFSET_MAX,
                    });
                }
            } else if !(BASIC_GAMMA_MIN..=BASIC_GAMMA_MAX).contains(&p.gamma) {
                return Err(OpError::ParamOutOfRange {
                    op: "Gamma",
                    param: "gamma",
                    value: p.gamma,
                    min: BASIC_GAMMA_MIN,
                    max: BASIC_GAMMA_MAX,
                });
            }
        }
        Ok(())
    }

    /// True when every channel is a no-op.
    pub fn is_identity(&self) -> bool {
        let moncurve = self.style.is_moncurve();
        self.params.iter().all(|p| p.is_identity(moncurve))
    }

    /// True when the style clamps values (BASIC clamps its base at zero).
    pub fn clamps(&self) -> bool {
        matches!(self.style, GammaStyle::BasicFwd | GammaStyle::BasicRev)
    }

    /// The inverse op (same parameters, opposite direction).
    pub fn inverse(&self) -> Self {
        Self {
            style: self.style.inverse(),
            params: self.params,
            metadata: self.metadata.clone(),
        }
    }

    /// Composes two basic gammas of the same family into one.
    ///
    /// Effective exponents multiply; returns None when either op is not
    /// basic or the product leaves the valid range.
    pub fn compose_basic(&self, second: &Self) -> Option<Self> {
        let eff = |d: &Self| -> Option<[f64; 4]> {
            match d.style {
                GammaStyle::BasicFwd => Some([
                    d.params[0].gamma,
                    d.params[1].gamma,
                    d.params[2].gamma,
                    d.params[3].gamma,
                ]),
                GammaStyle::BasicRev => Some([
                    1.0 / d.params[0].gamma,
                    1.0 / d.params[1].gamma,
                    1.0 / d.params[2].gamma,
                    1.0 / d.params[3].gamma,
                ]),
                _ => None,
            }
        };
        let a = eff(self)?;
        let b = eff(second)?;
        let mut gamma = [0.0; 4];
        for i in 0..4 {
            gamma[i] = a[i] * b[i];
            if !(BASIC_GAMMA_MIN..=BASIC_GAMMA_MAX).contains(&gamma[i]) {
                return None;
            }
        }
        Some(Self::basic(GammaStyle::BasicFwd, gamma))
    }

    /// Canonical id: every numeric parameter participates.
    pub fn cache_id(&self) -> String {
        let p: Vec<String> = self
            .params
            .iter()
            .map(|p| format!("{:?}/{:?}", p.gamma, p.offset))
            .collect();
        format!("Gamma style={:?} params=[{}]", self.style, p.join(","))
    }
}

// ============================================================================
// CPU kernel
// ============================================================================

/// Moncurve render constants for one channel, derived once per kernel.
#[derive(Debug, Clone, Copy)]
struct MoncurveParams {
    gamma: f32,
    /// 1 / (1 + offset).
    scale: f32,
    /// offset / (1 + offset).
    offset: f32,
    slope: f32,
    break_pnt: f32,
}

impl MoncurveParams {
    /// Derives the forward constants so curve and derivative are continuous
    /// at the breakpoint.
    fn forward(p: &GammaParams) -> Self {
        let g = p.gamma;
        let o = p.offset;
        if (g - 1.0).abs() < 1e-9 {
            // Degenerate: the curve collapses to its linear segment.
            return Self {
                gamma: 1.0,
                scale: (1.0 / (1.0 + o)) as f32,
                offset: (o / (1.0 + o)) as f32,
                slope: (1.0 / (1.0 + o)) as f32,
                break_pnt: f32::INFINITY,
            };
        }
        let break_pnt = o / (g - 1.0);
        let k = g * o / ((g - 1.0) * (1.0 + o));
        let slope = k.powf(g - 1.0) * g / (1.0 + o);
        Self {
            gamma: g as f32,
            scale: (1.0 / (1.0 + o)) as f32,
            offset: (o / (1.0 + o)) as f32,
            slope: slope as f32,
            break_pnt: break_pnt as f32,
        }
    }

    #[inline]
    fn apply_fwd(&self, x: f32) -> f32 {
        if x <= self.break_pnt {
            self.slope * x
        } else {
            (x * self.scale + self.offset).powf(self.gamma)
        }
    }

    #[inline]
    fn apply_rev(&self, y: f32) -> f32 {
        let break_y = self.slope * self.break_pnt;
        if y <= break_y {
            if self.slope == 0.0 {
                0.0
            } else {
                y / self.slope
            }
        } else {
            // Inverse of (x*scale + offset)^gamma.
            (y.powf(1.0 / self.gamma) - self.offset) / self.scale
        }
    }
}

/// Kernel shape.
#[derive(Debug, Clone)]
enum GammaKernelMode {
    Basic([f32; 4]),
    BasicMirror([f32; 4]),
    BasicPassThru([f32; 4]),
    MoncurveFwd([MoncurveParams; 4]),
    MoncurveRev([MoncurveParams; 4]),
    MoncurveMirrorFwd([MoncurveParams; 4]),
    MoncurveMirrorRev([MoncurveParams; 4]),
}

/// Prepared gamma kernel over packed RGBA f32 pixels.
#[derive(Debug, Clone)]
pub struct GammaKernel {
    mode: GammaKernelMode,
}

impl GammaKernel {
    /// Captures per-channel render constants, direction folded in.
    pub fn new(data: &GammaOpData) -> Self {
        let fwd = data.style.is_forward();
        let exponent = |p: &GammaParams| {
            if fwd {
                p.gamma as f32
            } else {
                (1.0 / p.gamma) as f32
            }
        };
        let exps = [
            exponent(&data.params[0]),
            exponent(&data.params[1]),
            exponent(&data.params[2]),
            exponent(&data.params[3]),
        ];
        let moncurve = || {
            [
                MoncurveParams::forward(&data.params[0]),
                MoncurveParams::forward(&data.params[1]),
                MoncurveParams::forward(&data.params[2]),
                MoncurveParams::forward(&data.params[3]),
            ]
        };
        let mode = match data.style {
            GammaStyle::BasicFwd | GammaStyle::BasicRev => GammaKernelMode::Basic(exps),
            GammaStyle::BasicMirrorFwd | GammaStyle::BasicMirrorRev => {
                GammaKernelMode::BasicMirror(exps)
            }
            GammaStyle::BasicPassThruFwd | GammaStyle::BasicPassThruRev => {
                GammaKernelMode::BasicPassThru(exps)
            }
            GammaStyle::MoncurveFwd => GammaKernelMode::MoncurveFwd(moncurve()),
            GammaStyle::MoncurveRev => GammaKernelMode::MoncurveRev(moncurve()),
            GammaStyle::MoncurveMirrorFwd => GammaKernelMode::MoncurveMirrorFwd(moncurve()),
            GammaStyle::MoncurveMirrorRev => GammaKernelMode::MoncurveMirrorRev(moncurve()),
        };
        Self { mode }
    }

    /// Applies to a packed RGBA buffer in place. Gamma has per-channel alpha
    /// parameters, so all four channels are processed.
    pub fn apply_rgba(&self, pixels: &mut [f32]) {
        debug_assert!(pixels.len() % 4 == 0);
        for chunk in pixels.chunks_exact_mut(4) {
            match &self.mode {
                GammaKernelMode::Basic(g) => {
                    for (c, g) in chunk.iter_mut().zip(g.iter()) {
                        *c = c.max(0.0).powf(*g);
                    }
                }
                GammaKernelMode::BasicMirror(g) => {
                    for (c, g) in chunk.iter_mut().zip(g.iter()) {
                        *c = c.abs().powf(*g).copysign(*c);
                    }
                }
                GammaKernelMode::BasicPassThru(g) => {
                    for (c, g) in chunk.iter_mut().zip(g.iter()) {
                        if *c > 0.0 {
                            *c = c.powf(*g);
                        }
                    }
                }
                GammaKernelMode::MoncurveFwd(p) => {
                    for (c, p) in chunk.iter_mut().zip(p.iter()) {
                        *c = p.apply_fwd(*c);
                    }
                }
                GammaKernelMode::MoncurveRev(p) => {
                    for (c, p) in chunk.iter_mut().zip(p.iter()) {
                        *c = p.apply_rev(*c);
                    }
                }
                GammaKernelMode::MoncurveMirrorFwd(p) => {
                    for (c, p) in chunk.iter_mut().zip(p.iter()) {
                        *c = p.apply_fwd(c.abs()).copysign(*c);
                    }
                }
                GammaKernelMode::MoncurveMirrorRev(p) => {
                    for (c, p) in chunk.iter_mut().zip(p.iter()) {
                        *c = p.apply_rev(c.abs()).copysign(*c);
                    }
                }
            }
        }
    }
}
