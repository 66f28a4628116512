//! Fixed-function ops: closed-form per-pixel transformations.
//!
//! Reference: OCIO ops/fixedfunction/FixedFunctionOpData.cpp,
//! FixedFunctionOpCPU.cpp
//!
//! Each style bakes its parameters into the op-data; validation enforces an
//! exact parameter count per style and numeric bounds where the style has
//! them. Alpha always passes through.

use crate::error::{OpError, OpResult};
use crate::metadata::FormatMetadata;

/// Fixed-function style, direction folded in where applicable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedFunctionStyle {
    /// ACES v0.3 red modifier, forward.
    AcesRedMod03Fwd,
    /// ACES v0.3 red modifier, inverse.
    AcesRedMod03Inv,
    /// ACES v1.0 red modifier, forward.
    AcesRedMod10Fwd,
    /// ACES v1.0 red modifier, inverse.
    AcesRedMod10Inv,
    /// ACES v0.3 glow, forward.
    AcesGlow03Fwd,
    /// ACES v0.3 glow, inverse.
    AcesGlow03Inv,
    /// ACES v1.0 glow, forward.
    AcesGlow10Fwd,
    /// ACES v1.0 glow, inverse.
    AcesGlow10Inv,
    /// ACES v1.0 dark-to-dim surround correction, forward.
    AcesDarkToDim10Fwd,
    /// ACES v1.0 dark-to-dim surround correction, inverse.
    AcesDarkToDim10Inv,
    /// ACES 1.3 reference gamut compression, forward.
    AcesGamutComp13Fwd,
    /// ACES 1.3 reference gamut compression, inverse.
    AcesGamutComp13Inv,
    /// Rec.2100 surround (HLG system gamma), forward.
    Rec2100SurroundFwd,
    /// Rec.2100 surround (HLG system gamma), inverse.
    Rec2100SurroundInv,
    /// Extended-range RGB to HSV.
    RgbToHsv,
    /// Extended-range HSV to RGB.
    HsvToRgb,
    /// CIE XYZ (D65) to L*a*b*, scaled by 1/100.
    XyzToLab,
    /// L*a*b* (scaled by 1/100) to CIE XYZ (D65).
    LabToXyz,
}

impl FixedFunctionStyle {
    /// Number of parameters the style requires.
    pub fn param_count(self) -> usize {
        match self {
            Self::AcesGamutComp13Fwd | Self::AcesGamutComp13Inv => 7,
            Self::Rec2100SurroundFwd | Self::Rec2100SurroundInv => 1,
            _ => 0,
        }
    }

    /// The style applying the opposite transformation.
    pub fn inverse(self) -> Self {
        match self {
            Self::AcesRedMod03Fwd => Self::AcesRedMod03Inv,
            Self::AcesRedMod03Inv => Self::AcesRedMod03Fwd,
            Self::AcesRedMod10Fwd => Self::AcesRedMod10Inv,
            Self::AcesRedMod10Inv => Self::AcesRedMod10Fwd,
            Self::AcesGlow03Fwd => Self::AcesGlow03Inv,
            Self::AcesGlow03Inv => Self::AcesGlow03Fwd,
            Self::AcesGlow10Fwd => Self::AcesGlow10Inv,
            Self::AcesGlow10Inv => Self::AcesGlow10Fwd,
            Self::AcesDarkToDim10Fwd => Self::AcesDarkToDim10Inv,
            Self::AcesDarkToDim10Inv => Self::AcesDarkToDim10Fwd,
            Self::AcesGamutComp13Fwd => Self::AcesGamutComp13Inv,
            Self::AcesGamutComp13Inv => Self::AcesGamutComp13Fwd,
            Self::Rec2100SurroundFwd => Self::Rec2100SurroundInv,
            Self::Rec2100SurroundInv => Self::Rec2100SurroundFwd,
            Self::RgbToHsv => Self::HsvToRgb,
            Self::HsvToRgb => Self::RgbToHsv,
            Self::XyzToLab => Self::LabToXyz,
            Self::LabToXyz => Self::XyzToLab,
        }
    }
}

/// Fixed-function op parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedFunctionOpData {
    /// The style.
    pub style: FixedFunctionStyle,
    /// Style parameters; length is fixed per style.
    pub params: Vec<f64>,
    /// Opaque metadata for file-format round trips.
    pub metadata: FormatMetadata,
}

/// GamutComp13 bounds, from the op-data validation (the strictest source).
const GC13_LIM_MIN: f64 = 1.001;
const GC13_LIM_MAX: f64 = 65504.0;
const GC13_THR_MIN: f64 = 0.0;
const GC13_THR_MAX: f64 = 0.9995;
const GC13_PWR_MIN: f64 = 1.0;
const GC13_PWR_MAX: f64 = 65504.0;

impl FixedFunctionOpData {
    /// Builds a parameterless style.
    pub fn new(style: FixedFunctionStyle) -> Self {
        Self {
            style,
            params: Vec::new(),
            metadata: FormatMetadata::new(),
        }
    }

    /// Builds a style with parameters.
    pub fn with_params(style: FixedFunctionStyle, params: Vec<f64>) -> Self {
        Self {
            style,
            params,
            metadata: FormatMetadata::new(),
        }
    }

    /// Checks the parameter count and, where the style defines them, bounds.
    pub fn validate(&self) -> OpResult<()> {
        let expected = self.style.param_count();
        if self.params.len() != expected {
            return Err(OpError::structural(
                "FixedFunction",
                format!(
                    "style {:?} requires {} parameter(s), got {}",
                    self.style,
                    expected,
                    self.params.len()
                ),
            ));
        }
        match self.style {
            FixedFunctionStyle::AcesGamutComp13Fwd | FixedFunctionStyle::AcesGamutComp13Inv => {
                // Order: lim_cyan, lim_magenta, lim_yellow,
                //        thr_cyan, thr_magenta, thr_yellow, power.
                let names = [
                    "lim_cyan",
                    "lim_magenta",
                    "lim_yellow",
                    "thr_cyan",
                    "thr_magenta",
                    "thr_yellow",
                    "power",
                ];
                for i in 0..3 {
                    self.check_bound(names[i], self.params[i], GC13_LIM_MIN, GC13_LIM_MAX)?;
                }
                for i in 3..6 {
                    self.check_bound(names[i], self.params[i], GC13_THR_MIN, GC13_THR_MAX)?;
                }
                self.check_bound(names[6], self.params[6], GC13_PWR_MIN, GC13_PWR_MAX)?;
            }
            FixedFunctionStyle::Rec2100SurroundFwd | FixedFunctionStyle::Rec2100SurroundInv => {
                self.check_bound("gamma", self.params[0], 0.01, 100.0)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn check_bound(&self, param: &'static str, value: f64, min: f64, max: f64) -> OpResult<()> {
        if !(min..=max).contains(&value) {
            return Err(OpError::ParamOutOfRange {
                op: "FixedFunction",
                param,
                value,
                min,
                max,
            });
        }
        Ok(())
    }

    /// Fixed functions are never the identity.
    pub fn is_identity(&self) -> bool {
        false
    }

    /// The inverse op (same parameters, opposite style).
    pub fn inverse(&self) -> Self {
        Self {
            style: self.style.inverse(),
            params: self.params.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// True when applying `self` then `other` cancels.
    pub fn is_inverse_of(&self, other: &Self) -> bool {
        self.style.inverse() == other.style && self.params == other.params
    }

    /// Canonical id: every numeric parameter participates.
    pub fn cache_id(&self) -> String {
        format!("FixedFunction style={:?} params={:?}", self.style, self.params)
    }
}

// ============================================================================
// CPU kernel
// ============================================================================

/// Kernel shape with style constants resolved.
#[derive(Debug, Clone)]
enum FixedFunctionKernelMode {
    RedMod {
        one_minus_scale: f32,
        pivot: f32,
        inv_width: f32,
        hue_restore: bool,
        forward: bool,
    },
    Glow {
        gain: f32,
        mid: f32,
        forward: bool,
    },
    /// Shared by DarkToDim and Rec2100Surround: `out = rgb * Y^(g-1)`.
    LumaGain {
        gamma_minus_one: f32,
        weights: [f32; 3],
        min_lum: f32,
    },
    GamutComp {
        thr: [f32; 3],
        scale: [f32; 3],
        power: f32,
        forward: bool,
    },
    RgbToHsv,
    HsvToRgb,
    XyzToLab,
    LabToXyz,
}

/// Prepared fixed-function kernel over packed RGBA f32 pixels.
#[derive(Debug, Clone)]
pub struct FixedFunctionKernel {
    mode: FixedFunctionKernelMode,
}

/// AP1 luma weights for the dark-to-dim surround correction.
const AP1_LUMA: [f32; 3] = [0.272_228_72, 0.674_081_77, 0.053_689_517];

/// Rec.2100 luma weights.
const REC2100_LUMA: [f32; 3] = [0.2627, 0.6780, 0.0593];

impl FixedFunctionKernel {
    /// Captures style constants. The data must have validated.
    pub fn new(data: &FixedFunctionOpData) -> Self {
        use FixedFunctionStyle as S;
        let mode = match data.style {
            S::AcesRedMod03Fwd | S::AcesRedMod03Inv => FixedFunctionKernelMode::RedMod {
                one_minus_scale: 1.0 - 0.85,
                pivot: 0.03,
                // 4 / (120 degree window in radians)
                inv_width: 1.909_859_3,
                hue_restore: true,
                forward: data.style == S::AcesRedMod03Fwd,
            },
            S::AcesRedMod10Fwd | S::AcesRedMod10Inv => FixedFunctionKernelMode::RedMod {
                one_minus_scale: 1.0 - 0.82,
                pivot: 0.03,
                // 4 / (135 degree window in radians)
                inv_width: 1.697_652_7,
                hue_restore: false,
                forward: data.style == S::AcesRedMod10Fwd,
            },
            S::AcesGlow03Fwd | S::AcesGlow03Inv => FixedFunctionKernelMode::Glow {
                gain: 0.075,
                mid: 0.1,
                forward: data.style == S::AcesGlow03Fwd,
            },
            S::AcesGlow10Fwd | S::AcesGlow10Inv => FixedFunctionKernelMode::Glow {
                gain: 0.05,
                mid: 0.08,
                forward: data.style == S::AcesGlow10Fwd,
            },
            S::AcesDarkToDim10Fwd => FixedFunctionKernelMode::LumaGain {
                gamma_minus_one: 0.9811 - 1.0,
                weights: AP1_LUMA,
                min_lum: 1e-10,
            },
            S::AcesDarkToDim10Inv => FixedFunctionKernelMode::LumaGain {
                gamma_minus_one: 1.019_264_1 - 1.0,
                weights: AP1_LUMA,
                min_lum: 1e-10,
            },
            S::Rec2100SurroundFwd | S::Rec2100SurroundInv => {
                let g = if data.style == S::Rec2100SurroundFwd {
                    data.params[0]
                } else {
                    1.0 / data.params[0]
                };
                FixedFunctionKernelMode::LumaGain {
                    gamma_minus_one: (g - 1.0) as f32,
                    weights: REC2100_LUMA,
                    // Larger floor than DarkToDim to bound the gain on dark
                    // colors without distorting the HLG curve shape.
                    min_lum: 1e-4,
                }
            }
            S::AcesGamutComp13Fwd | S::AcesGamutComp13Inv => {
                let power = data.params[6];
                let mut thr = [0.0f32; 3];
                let mut scale = [0.0f32; 3];
                for i in 0..3 {
                    let lim = data.params[i];
                    let t = data.params[3 + i];
                    thr[i] = t as f32;
                    // Distance scale so the compression curve passes through
                    // the limit at distance 1.
                    let s = (lim - t)
                        / (((1.0 - t) / (lim - t)).powf(-power) - 1.0).powf(1.0 / power);
                    scale[i] = s as f32;
                }
                FixedFunctionKernelMode::GamutComp {
                    thr,
                    scale,
                    power: power as f32,
                    forward: data.style == S::AcesGamutComp13Fwd,
                }
            }
            S::RgbToHsv => FixedFunctionKernelMode::RgbToHsv,
            S::HsvToRgb => FixedFunctionKernelMode::HsvToRgb,
            S::XyzToLab => FixedFunctionKernelMode::XyzToLab,
            S::LabToXyz => FixedFunctionKernelMode::LabToXyz,
        };
        Self { mode }
    }

    /// Applies to a packed RGBA buffer in place. Alpha passes through.
    pub fn apply_rgba(&self, pixels: &mut [f32]) {
        debug_assert!(pixels.len() % 4 == 0);
        for chunk in pixels.chunks_exact_mut(4) {
            let rgb = [chunk[0], chunk[1], chunk[2]];
            let out = match &self.mode {
                FixedFunctionKernelMode::RedMod {
                    one_minus_scale,
                    pivot,
                    inv_width,
                    hue_restore,
                    forward,
                } => red_mod(rgb, *one_minus_scale, *pivot, *inv_width, *hue_restore, *forward),
                FixedFunctionKernelMode::Glow { gain, mid, forward } => {
                    glow(rgb, *gain, *mid, *forward)
                }
                FixedFunctionKernelMode::LumaGain {
                    gamma_minus_one,
                    weights,
                    min_lum,
                } => luma_gain(rgb, *gamma_minus_one, weights, *min_lum),
                FixedFunctionKernelMode::GamutComp {
                    thr,
                    scale,
                    power,
                    forward,
                } => gamut_comp13(rgb, thr, scale, *power, *forward),
                FixedFunctionKernelMode::RgbToHsv => rgb_to_hsv(rgb),
                FixedFunctionKernelMode::HsvToRgb => hsv_to_rgb(rgb),
                FixedFunctionKernelMode::XyzToLab => xyz_to_lab(rgb),
                FixedFunctionKernelMode::LabToXyz => lab_to_xyz(rgb),
            };
            chunk[0] = out[0];
            chunk[1] = out[1];
            chunk[2] = out[2];
        }
    }
}

// ============================================================================
// ACES helpers
// ============================================================================

/// Quadratic B-spline weight for the hue window centered on red.
fn calc_hue_weight(rgb: [f32; 3], inv_width: f32) -> f32 {
    // RGB to Yab chroma plane.
    let a = 2.0 * rgb[0] - (rgb[1] + rgb[2]);
    const SQRT3: f32 = 1.732_050_8;
    let b = SQRT3 * (rgb[1] - rgb[2]);

    let hue = b.atan2(a);

    let knot_coord = hue * inv_width + 2.0;
    let j = knot_coord as i32;

    // Quadratic B-spline basis coefficients, from the ACES ctl code.
    const M: [[f32; 4]; 4] = [
        [0.25, 0.00, 0.00, 0.00],
        [-0.75, 0.75, 0.75, 0.25],
        [0.75, -1.50, 0.00, 1.00],
        [-0.25, 0.75, -0.75, 0.25],
    ];

    if (0..4).contains(&j) {
        let t = knot_coord - j as f32;
        let coefs = &M[j as usize];
        coefs[3] + t * (coefs[2] + t * (coefs[1] + t * coefs[0]))
    } else {
        0.0
    }
}

/// Saturation proxy; the denominator floor keeps dark noise from being
/// classified as saturated.
fn calc_sat_weight(rgb: [f32; 3], noise_limit: f32) -> f32 {
    let min_val = rgb[0].min(rgb[1]).min(rgb[2]);
    let max_val = rgb[0].max(rgb[1]).max(rgb[2]);
    (max_val.max(1e-10) - min_val.max(1e-10)) / max_val.max(noise_limit)
}

const RED_MOD_NOISE_LIMIT: f32 = 1e-2;

fn red_mod(
    rgb: [f32; 3],
    one_minus_scale: f32,
    pivot: f32,
    inv_width: f32,
    hue_restore: bool,
    forward: bool,
) -> [f32; 3] {
    let [red, mut grn, mut blu] = rgb;
    let f_h = calc_hue_weight(rgb, inv_width);
    if f_h <= 0.0 {
        return rgb;
    }

    let new_red = if forward {
        let f_s = calc_sat_weight(rgb, RED_MOD_NOISE_LIMIT);
        red + f_h * f_s * (pivot - red) * one_minus_scale
    } else {
        // Solve the forward formula for the original red.
        let min_chan = grn.min(blu);
        let a = f_h * one_minus_scale - 1.0;
        let b = red - f_h * (pivot + min_chan) * one_minus_scale;
        let c = f_h * pivot * min_chan * one_minus_scale;
        (-b - (b * b - 4.0 * a * c).sqrt()) / (2.0 * a)
    };

    if hue_restore {
        if grn >= blu {
            // red >= grn >= blu within the window
            let hue_fac = (grn - blu) / (red - blu).max(1e-10);
            grn = hue_fac * (new_red - blu) + blu;
        } else {
            // red >= blu >= grn
            let hue_fac = (blu - grn) / (red - grn).max(1e-10);
            blu = hue_fac * (new_red - grn) + grn;
        }
    }

    [new_red, grn, blu]
}

/// Luma plus chroma magnitude.
fn rgb_to_yc(rgb: [f32; 3]) -> f32 {
    const YC_RADIUS_WEIGHT: f32 = 1.75;
    let [r, g, b] = rgb;
    let chroma = (b * (b - g) + g * (g - r) + r * (r - b)).sqrt();
    (b + g + r + YC_RADIUS_WEIGHT * chroma) / 3.0
}

fn sigmoid_shaper(sat: f32) -> f32 {
    let x = (sat - 0.4) * 5.0;
    let sign = 1.0f32.copysign(x);
    let t = (1.0 - 0.5 * sign * x).max(0.0);
    (1.0 + sign * (1.0 - t * t)) * 0.5
}

fn glow(rgb: [f32; 3], gain: f32, mid: f32, forward: bool) -> [f32; 3] {
    let yc = rgb_to_yc(rgb);
    let sat = calc_sat_weight(rgb, RED_MOD_NOISE_LIMIT);
    let s = sigmoid_shaper(sat);
    let glow_gain = gain * s;

    let glow_gain_out = if forward {
        if yc >= mid * 2.0 {
            0.0
        } else if yc <= mid * 2.0 / 3.0 {
            glow_gain
        } else {
            glow_gain * (mid / yc - 0.5)
        }
    } else if yc >= mid * 2.0 {
        0.0
    } else if yc <= (1.0 + glow_gain) * mid * 2.0 / 3.0 {
        -glow_gain / (1.0 + glow_gain)
    } else {
        glow_gain * (mid / yc - 0.5) / (glow_gain * 0.5 - 1.0)
    };

    let f = 1.0 + glow_gain_out;
    [rgb[0] * f, rgb[1] * f, rgb[2] * f]
}

/// `out = rgb * Y^(g-1)` with a luma floor.
fn luma_gain(rgb: [f32; 3], gamma_minus_one: f32, weights: &[f32; 3], min_lum: f32) -> [f32; 3] {
    let y = (weights[0] * rgb[0] + weights[1] * rgb[1] + weights[2] * rgb[2]).max(min_lum);
    let f = y.powf(gamma_minus_one);
    [rgb[0] * f, rgb[1] * f, rgb[2] * f]
}

fn gc13_compress(dist: f32, thr: f32, scale: f32, power: f32) -> f32 {
    let nd = (dist - thr) / scale;
    let p = nd.powf(power);
    thr + scale * nd / (1.0 + p).powf(1.0 / power)
}

fn gc13_uncompress(dist: f32, thr: f32, scale: f32, power: f32) -> f32 {
    // The compression curve asymptotes at thr + scale; beyond it there is no
    // preimage, so pass the distance through.
    if dist >= thr + scale {
        return dist;
    }
    let nd = (dist - thr) / scale;
    let p = nd.powf(power);
    thr + scale * (p / (1.0 - p)).powf(1.0 / power)
}

fn gamut_comp13(rgb: [f32; 3], thr: &[f32; 3], scale: &[f32; 3], power: f32, fwd: bool) -> [f32; 3] {
    let ach = rgb[0].max(rgb[1]).max(rgb[2]);
    let mut out = rgb;
    if ach == 0.0 {
        return out;
    }
    for i in 0..3 {
        let dist = (ach - rgb[i]) / ach.abs();
        if dist < thr[i] {
            continue;
        }
        let compr = if fwd {
            gc13_compress(dist, thr[i], scale[i], power)
        } else {
            gc13_uncompress(dist, thr[i], scale[i], power)
        };
        out[i] = ach - compr * ach.abs();
    }
    out
}

// ============================================================================
// Color model conversions
// ============================================================================

/// Extended-range RGB to HSV. For a mix of positive and negative channels,
/// saturation lands in (1, 2]; hue is always in [0, 1).
fn rgb_to_hsv(rgb: [f32; 3]) -> [f32; 3] {
    let [red, grn, blu] = rgb;
    let rgb_min = red.min(grn).min(blu);
    let rgb_max = red.max(grn).max(blu);

    let mut val = rgb_max;
    let mut sat = 0.0;
    let mut hue = 0.0;

    if rgb_min != rgb_max {
        let delta = rgb_max - rgb_min;
        if rgb_max != 0.0 {
            sat = delta / rgb_max;
        }
        hue = if red == rgb_max {
            (grn - blu) / delta
        } else if grn == rgb_max {
            2.0 + (blu - red) / delta
        } else {
            4.0 + (red - grn) / delta
        };
        if hue < 0.0 {
            hue += 6.0;
        }
        hue *= 1.0 / 6.0;
    }

    if rgb_min < 0.0 {
        val += rgb_min;
    }
    if -rgb_min > rgb_max {
        sat = (rgb_max - rgb_min) / -rgb_min;
    }

    [hue, sat, val]
}

/// Extended-range HSV to RGB. Hue wraps; saturation clamps just below 2 so
/// outputs stay bounded.
fn hsv_to_rgb(hsv: [f32; 3]) -> [f32; 3] {
    const MAX_SAT: f32 = 1.999;

    let hue = (hsv[0] - hsv[0].floor()) * 6.0;
    let sat = hsv[1].clamp(0.0, MAX_SAT);
    let val = hsv[2];

    let red = ((hue - 3.0).abs() - 1.0).clamp(0.0, 1.0);
    let grn = (2.0 - (hue - 2.0).abs()).clamp(0.0, 1.0);
    let blu = (2.0 - (hue - 4.0).abs()).clamp(0.0, 1.0);

    let mut rgb_max = val;
    let mut rgb_min = val * (1.0 - sat);
    if sat > 1.0 {
        rgb_min = val * (1.0 - sat) / (2.0 - sat);
        rgb_max = val - rgb_min;
    }
    if val < 0.0 {
        rgb_min = val / (2.0 - sat);
        rgb_max = val - rgb_min;
    }

    let delta = rgb_max - rgb_min;
    [
        red * delta + rgb_min,
        grn * delta + rgb_min,
        blu * delta + rgb_min,
    ]
}

/// D65 white point.
const LAB_XN: f32 = 0.95047;
const LAB_ZN: f32 = 1.08883;
/// (6/29)^3, below which the L* curve is linear.
const LAB_EPS: f32 = 0.008_856_452;
/// Slope of the linear segment: (29/6)^2 / 3 / 116 * 100, i.e. kappa/116
/// after the 1/100 scaling.
const LAB_KAPPA_SLOPE: f32 = 7.787_037;
const LAB_LINEAR_OFFSET: f32 = 16.0 / 116.0;

#[inline]
fn lab_f(t: f32) -> f32 {
    if t > LAB_EPS {
        t.cbrt()
    } else {
        LAB_KAPPA_SLOPE * t + LAB_LINEAR_OFFSET
    }
}

#[inline]
fn lab_f_inv(t: f32) -> f32 {
    let t3 = t * t * t;
    if t3 > LAB_EPS {
        t3
    } else {
        (t - LAB_LINEAR_OFFSET) / LAB_KAPPA_SLOPE
    }
}

/// XYZ to L*a*b* with all three outputs scaled by 1/100.
fn xyz_to_lab(xyz: [f32; 3]) -> [f32; 3] {
    let fx = lab_f(xyz[0] / LAB_XN);
    let fy = lab_f(xyz[1]);
    let fz = lab_f(xyz[2] / LAB_ZN);
    [1.16 * fy - 0.16, 5.0 * (fx - fy), 2.0 * (fy - fz)]
}

/// Inverse of [`xyz_to_lab`].
fn lab_to_xyz(lab: [f32; 3]) -> [f32; 3] {
    let fy = (lab[0] + 0.16) / 1.16;
    let fx = fy + lab[1] / 5.0;
    let fz = fy - lab[2] / 2.0;
    [LAB_XN * lab_f_inv(fx), lab_f_inv(fy), LAB_ZN * lab_f_inv(fz)]
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn apply(style: FixedFunctionStyle, params: Vec<f64>, rgb: [f32; 3]) -> [f32; 3] {
        let data = FixedFunctionOpData::with_params(style, params);
        data.validate().unwrap();
        let kernel = FixedFunctionKernel::new(&data);
        let mut pixels = [rgb[0], rgb[1], rgb[2], 1.0];
        kernel.apply_rgba(&mut pixels);
        [pixels[0], pixels[1], pixels[2]]
    }

    #[test]
    fn param_count_enforced() {
        let missing = FixedFunctionOpData::new(FixedFunctionStyle::Rec2100SurroundFwd);
        assert!(missing.validate().is_err());

        let extra = FixedFunctionOpData::with_params(FixedFunctionStyle::RgbToHsv, vec![1.0]);
        assert!(extra.validate().is_err());
    }

    #[test]
    fn gamut_comp_bounds_enforced() {
        // lim below 1.001 is out of range.
        let bad = FixedFunctionOpData::with_params(
            FixedFunctionStyle::AcesGamutComp13Fwd,
            vec![1.0, 1.2, 1.5, 0.8, 0.8, 0.8, 1.2],
        );
        let err = bad.validate().unwrap_err();
        assert!(err.to_string().contains("lim_cyan"));

        let ok = FixedFunctionOpData::with_params(
            FixedFunctionStyle::AcesGamutComp13Fwd,
            vec![1.147, 1.264, 1.312, 0.815, 0.803, 0.880, 1.2],
        );
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn gamut_comp_leaves_in_gamut_colors() {
        let params = vec![1.147, 1.264, 1.312, 0.815, 0.803, 0.880, 1.2];
        let rgb = [0.5, 0.4, 0.45];
        let out = apply(FixedFunctionStyle::AcesGamutComp13Fwd, params, rgb);
        for i in 0..3 {
            assert!((out[i] - rgb[i]).abs() < EPSILON);
        }
    }

    #[test]
    fn gamut_comp_round_trip() {
        let params = vec![1.147, 1.264, 1.312, 0.815, 0.803, 0.880, 1.2];
        let rgb = [0.9, -0.3, 0.1]; // well out of gamut
        let fwd = apply(FixedFunctionStyle::AcesGamutComp13Fwd, params.clone(), rgb);
        // Compression pulls the distance in.
        assert!(fwd[1] > rgb[1]);
        let back = apply(FixedFunctionStyle::AcesGamutComp13Inv, params, fwd);
        for i in 0..3 {
            assert!((back[i] - rgb[i]).abs() < 1e-4, "{:?} vs {:?}", back, rgb);
        }
    }

    #[test]
    fn red_mod_10_round_trip() {
        let rgb = [0.9, 0.05, 0.04];
        let fwd = apply(FixedFunctionStyle::AcesRedMod10Fwd, vec![], rgb);
        assert!(fwd[0] < rgb[0]); // red pulled toward the pivot
        assert_eq!(fwd[1], rgb[1]);
        let back = apply(FixedFunctionStyle::AcesRedMod10Inv, vec![], fwd);
        assert!((back[0] - rgb[0]).abs() < 1e-4);
    }

    #[test]
    fn red_mod_outside_window_is_identity() {
        // A pure green pixel is far from the red hue window.
        let rgb = [0.1, 0.8, 0.1];
        let out = apply(FixedFunctionStyle::AcesRedMod03Fwd, vec![], rgb);
        assert_eq!(out, rgb);
    }

    #[test]
    fn glow_boosts_dark_saturated_colors() {
        let rgb = [0.08, 0.01, 0.02];
        let out = apply(FixedFunctionStyle::AcesGlow03Fwd, vec![], rgb);
        assert!(out[0] > rgb[0]);

        let back = apply(FixedFunctionStyle::AcesGlow03Inv, vec![], out);
        for i in 0..3 {
            assert!((back[i] - rgb[i]).abs() < 1e-4);
        }
    }

    #[test]
    fn glow_leaves_bright_colors() {
        let rgb = [0.9, 0.8, 0.85];
        let out = apply(FixedFunctionStyle::AcesGlow10Fwd, vec![], rgb);
        for i in 0..3 {
            assert!((out[i] - rgb[i]).abs() < EPSILON);
        }
    }

    #[test]
    fn dark_to_dim_round_trip() {
        let rgb = [0.3, 0.25, 0.2];
        let fwd = apply(FixedFunctionStyle::AcesDarkToDim10Fwd, vec![], rgb);
        let back = apply(FixedFunctionStyle::AcesDarkToDim10Inv, vec![], fwd);
        for i in 0..3 {
            assert!((back[i] - rgb[i]).abs() < 1e-3);
        }
    }

    #[test]
    fn rec2100_surround_applies_system_gamma() {
        let rgb = [0.5, 0.5, 0.5];
        let out = apply(FixedFunctionStyle::Rec2100SurroundFwd, vec![1.2], rgb);
        // Y = 0.5, gain = 0.5^0.2
        let expect = 0.5 * 0.5f32.powf(0.2);
        assert!((out[0] - expect).abs() < EPSILON);

        let back = apply(FixedFunctionStyle::Rec2100SurroundInv, vec![1.2], out);
        assert!((back[0] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn hsv_round_trip_classic_range() {
        for rgb in [[0.2, 0.5, 0.8], [1.0, 0.0, 0.0], [0.3, 0.3, 0.3], [0.9, 0.7, 0.1]] {
            let hsv = apply(FixedFunctionStyle::RgbToHsv, vec![], rgb);
            let back = apply(FixedFunctionStyle::HsvToRgb, vec![], hsv);
            for i in 0..3 {
                assert!((back[i] - rgb[i]).abs() < 1e-5, "{:?} -> {:?} -> {:?}", rgb, hsv, back);
            }
        }
    }

    #[test]
    fn hsv_extended_range() {
        // Mixed-sign RGB puts saturation above 1.
        let hsv = apply(FixedFunctionStyle::RgbToHsv, vec![], [0.5, -0.4, 0.0]);
        assert!(hsv[1] > 1.0 && hsv[1] <= 2.0);

        let back = apply(FixedFunctionStyle::HsvToRgb, vec![], hsv);
        assert!((back[0] - 0.5).abs() < 1e-5);
        assert!((back[1] + 0.4).abs() < 1e-5);
    }

    #[test]
    fn lab_round_trip_and_white() {
        // D65 white maps to L=1 (scaled), a=b=0.
        let lab = apply(FixedFunctionStyle::XyzToLab, vec![], [LAB_XN, 1.0, LAB_ZN]);
        assert!((lab[0] - 1.0).abs() < 1e-5);
        assert!(lab[1].abs() < 1e-5);
        assert!(lab[2].abs() < 1e-5);

        for xyz in [[0.2, 0.3, 0.4], [0.05, 0.04, 0.06], [0.001, 0.001, 0.001]] {
            let lab = apply(FixedFunctionStyle::XyzToLab, vec![], xyz);
            let back = apply(FixedFunctionStyle::LabToXyz, vec![], lab);
            for i in 0..3 {
                assert!((back[i] - xyz[i]).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn inverse_pairs() {
        let fwd = FixedFunctionOpData::new(FixedFunctionStyle::AcesGlow10Fwd);
        let inv = fwd.inverse();
        assert_eq!(inv.style, FixedFunctionStyle::AcesGlow10Inv);
        assert!(fwd.is_inverse_of(&inv));

        let hsv = FixedFunctionOpData::new(FixedFunctionStyle::RgbToHsv);
        assert_eq!(hsv.inverse().style, FixedFunctionStyle::HsvToRgb);
    }
}
