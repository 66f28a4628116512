//! Grading primary op: brightness/contrast/gamma style color correction.
//!
//! Reference: OCIO ops/gradingprimary/GradingPrimary.cpp,
//! GradingPrimaryOpCPU.cpp
//!
//! Three styles share one value struct but read different fields:
//!
//! * `Log`: brightness, contrast, gamma around a contrast pivot.
//! * `Lin`: offset, exposure (in stops), contrast around a linear pivot.
//! * `Video`: lift, gamma, gain, offset between black/white pivots.
//!
//! All styles end with saturation (Rec.709 luma) and a clamp. The value may
//! be dynamic: the kernel snapshots it on every apply, so edits through a
//! shared handle take effect without rebuilding.

use ocre_core::pixel::REC709_LUMA;

use crate::dynamic::DynamicProperty;
use crate::error::{OpError, OpResult};
use crate::metadata::FormatMetadata;
use crate::op::Direction;

/// Per-channel value plus a master applied to all channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradingRgbm {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub master: f64,
}

impl GradingRgbm {
    /// All components set to the same value.
    pub fn splat(v: f64) -> Self {
        Self {
            red: v,
            green: v,
            blue: v,
            master: v,
        }
    }

    /// Channel values with master added (brightness, offset, lift).
    fn sums(&self) -> [f64; 3] {
        [
            self.master + self.red,
            self.master + self.green,
            self.master + self.blue,
        ]
    }

    /// Channel values with master multiplied in (contrast, gamma, gain).
    fn products(&self) -> [f64; 3] {
        [
            self.master * self.red,
            self.master * self.green,
            self.master * self.blue,
        ]
    }
}

/// Grading style selecting which fields of [`GradingPrimary`] apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradingStyle {
    Log,
    Lin,
    Video,
}

/// Clamp bound meaning "no clamp"; the renderers rely on these exact values.
pub const NO_CLAMP_BLACK: f64 = f64::MIN;
pub const NO_CLAMP_WHITE: f64 = f64::MAX;

/// The full set of grading primary controls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradingPrimary {
    /// Log: additive, scaled by 6.25/1023 in code values.
    pub brightness: GradingRgbm,
    /// Log and Lin: multiplicative around the contrast pivot.
    pub contrast: GradingRgbm,
    /// Log and Video: power between the black and white pivots.
    pub gamma: GradingRgbm,
    /// Lin and Video: additive.
    pub offset: GradingRgbm,
    /// Lin: exposure in stops.
    pub exposure: GradingRgbm,
    /// Video: additive, folded into offset.
    pub lift: GradingRgbm,
    /// Video: multiplicative, folded into the slope.
    pub gain: GradingRgbm,
    /// Applied around Rec.709 luma.
    pub saturation: f64,
    /// Contrast pivot. Log: code value, remapped to 0.5 + 0.5*pivot.
    /// Lin: stops, remapped to 0.18 * 2^pivot.
    pub pivot: f64,
    pub pivot_black: f64,
    pub pivot_white: f64,
    pub clamp_black: f64,
    pub clamp_white: f64,
}

impl Default for GradingPrimary {
    fn default() -> Self {
        Self {
            brightness: GradingRgbm::splat(0.0),
            contrast: GradingRgbm::splat(1.0),
            gamma: GradingRgbm::splat(1.0),
            offset: GradingRgbm::splat(0.0),
            exposure: GradingRgbm::splat(0.0),
            lift: GradingRgbm::splat(0.0),
            gain: GradingRgbm::splat(1.0),
            saturation: 1.0,
            pivot: 0.0,
            pivot_black: 0.0,
            pivot_white: 1.0,
            clamp_black: NO_CLAMP_BLACK,
            clamp_white: NO_CLAMP_WHITE,
        }
    }
}

/// Lower bound for gamma (Log, Video) and contrast (Lin), with a small
/// tolerance so a value set to exactly 0.01 passes.
const GRADING_LOWER_BOUND: f64 = 0.01;
const GRADING_BOUND_ERROR: f64 = 1e-6;
const GRADING_MIN: f64 = GRADING_LOWER_BOUND - GRADING_BOUND_ERROR;

impl GradingPrimary {
    /// Checks style-dependent bounds.
    pub fn validate(&self, style: GradingStyle) -> OpResult<()> {
        if style != GradingStyle::Lin {
            let g = &self.gamma;
            if g.red < GRADING_MIN
                || g.green < GRADING_MIN
                || g.blue < GRADING_MIN
                || g.master < GRADING_MIN
            {
                return Err(OpError::structural(
                    "GradingPrimary",
                    format!("gamma is below lower bound ({GRADING_LOWER_BOUND})"),
                ));
            }
        }
        if style == GradingStyle::Lin {
            let c = &self.contrast;
            if c.red < GRADING_MIN
                || c.green < GRADING_MIN
                || c.blue < GRADING_MIN
                || c.master < GRADING_MIN
            {
                return Err(OpError::structural(
                    "GradingPrimary",
                    format!("contrast is below lower bound ({GRADING_LOWER_BOUND})"),
                ));
            }
        }
        if (self.pivot_white - self.pivot_black) < GRADING_MIN {
            return Err(OpError::structural(
                "GradingPrimary",
                "black pivot must be smaller than white pivot",
            ));
        }
        if self.clamp_black > self.clamp_white {
            return Err(OpError::structural(
                "GradingPrimary",
                "black clamp must be smaller than white clamp",
            ));
        }
        Ok(())
    }
}

/// Grading primary op parameters.
#[derive(Debug, Clone)]
pub struct GradingPrimaryOpData {
    /// The style.
    pub style: GradingStyle,
    /// The grading value; shared when the op is dynamic.
    pub value: DynamicProperty<GradingPrimary>,
    /// Whether the value stays editable after the processor is built.
    pub dynamic: bool,
    /// Forward applies the grade.
    pub direction: Direction,
    /// Opaque metadata for file-format round trips.
    pub metadata: FormatMetadata,
}

impl GradingPrimaryOpData {
    /// A neutral grade of the given style.
    pub fn new(style: GradingStyle) -> Self {
        Self {
            style,
            value: DynamicProperty::new(GradingPrimary::default()),
            dynamic: false,
            direction: Direction::Forward,
            metadata: FormatMetadata::new(),
        }
    }

    /// Builds from an explicit value.
    pub fn with_value(style: GradingStyle, value: GradingPrimary, direction: Direction) -> Self {
        Self {
            style,
            value: DynamicProperty::new(value),
            dynamic: false,
            direction,
            metadata: FormatMetadata::new(),
        }
    }

    /// Marks the value as editable post-build.
    pub fn make_dynamic(mut self) -> Self {
        self.dynamic = true;
        self
    }

    /// Validates the current value against the style.
    pub fn validate(&self) -> OpResult<()> {
        self.value.get().validate(self.style)
    }

    /// True when the grade is neutral and cannot change.
    ///
    /// A dynamic op is never an identity: the value may be edited after
    /// optimization has run.
    pub fn is_identity(&self) -> bool {
        !self.dynamic && is_neutral(self.style, &self.value.get())
    }

    /// The inverse op; shares the dynamic value with `self`.
    pub fn inverse(&self) -> Self {
        Self {
            direction: self.direction.invert(),
            ..self.clone()
        }
    }

    /// Canonical id. A dynamic op gets a non-reusable id since the value
    /// can change under the cache.
    pub fn cache_id(&self) -> String {
        if self.dynamic {
            format!("GradingPrimary {:?} dynamic dir={}", self.style, self.direction)
        } else {
            format!(
                "GradingPrimary {:?} {:?} dir={}",
                self.style,
                self.value.get(),
                self.direction
            )
        }
    }
}

/// Neutral check mirrors the render constants, not the raw controls, so a
/// master/channel pair that cancels out still counts as neutral.
fn is_neutral(style: GradingStyle, v: &GradingPrimary) -> bool {
    if v.clamp_black != NO_CLAMP_BLACK || v.clamp_white != NO_CLAMP_WHITE {
        return false;
    }
    if v.saturation != 1.0 {
        return false;
    }
    match style {
        GradingStyle::Log => {
            v.brightness.sums() == [0.0; 3]
                && v.contrast.products() == [1.0; 3]
                && v.gamma.products() == [1.0; 3]
        }
        GradingStyle::Lin => {
            v.offset.sums() == [0.0; 3]
                && v.exposure.sums() == [0.0; 3]
                && v.contrast.products() == [1.0; 3]
        }
        GradingStyle::Video => {
            let lifts = v.lift.sums();
            let offsets = v.offset.sums();
            offsets == [0.0; 3]
                && lifts == [0.0; 3]
                && v.gain.products() == [1.0; 3]
                && v.gamma.products() == [1.0; 3]
        }
    }
}

// ============================================================================
// CPU kernel
// ============================================================================

/// Render constants for one snapshot of the value.
#[derive(Debug, Clone, Copy)]
struct PrimaryConstants {
    /// Additive term (brightness, offset, or offset+lift; negated in reverse).
    offset: [f32; 3],
    /// Multiplicative term (contrast, 2^exposure, or video slope).
    slope: [f32; 3],
    /// Power term; identity powers are skipped.
    gamma: [f32; 3],
    apply_gamma: bool,
    /// Contrast pivot (Log/Lin) or black pivot (Video slope anchor).
    pivot: f32,
    pivot_black: f32,
    pivot_white: f32,
    clamp_black: f32,
    clamp_white: f32,
    saturation: f32,
    bypass: bool,
}

/// Prepared grading primary kernel over packed RGBA f32 pixels.
///
/// Holds the dynamic value handle; constants are rebuilt on each apply.
#[derive(Debug, Clone)]
pub struct GradingPrimaryKernel {
    style: GradingStyle,
    forward: bool,
    value: DynamicProperty<GradingPrimary>,
}

impl GradingPrimaryKernel {
    pub fn new(data: &GradingPrimaryOpData) -> Self {
        Self {
            style: data.style,
            forward: data.direction == Direction::Forward,
            value: data.value.clone(),
        }
    }

    /// Applies to a packed RGBA buffer in place. Alpha passes through.
    pub fn apply_rgba(&self, pixels: &mut [f32]) {
        debug_assert!(pixels.len() % 4 == 0);
        let v = self.value.get();
        let k = build_constants(self.style, self.forward, &v);
        if k.bypass {
            return;
        }
        match (self.style, self.forward) {
            (GradingStyle::Log, true) => {
                for px in pixels.chunks_exact_mut(4) {
                    apply_offset(px, &k.offset);
                    apply_contrast(px, &k.slope, k.pivot);
                    if k.apply_gamma {
                        apply_gamma(px, &k.gamma, k.pivot_black, k.pivot_white);
                    }
                    apply_saturation(px, k.saturation);
                    apply_clamp(px, k.clamp_black, k.clamp_white);
                }
            }
            (GradingStyle::Log, false) => {
                for px in pixels.chunks_exact_mut(4) {
                    apply_clamp(px, k.clamp_black, k.clamp_white);
                    apply_saturation(px, k.saturation);
                    if k.apply_gamma {
                        apply_gamma(px, &k.gamma, k.pivot_black, k.pivot_white);
                    }
                    apply_contrast(px, &k.slope, k.pivot);
                    apply_offset(px, &k.offset);
                }
            }
            (GradingStyle::Lin, true) => {
                for px in pixels.chunks_exact_mut(4) {
                    apply_offset(px, &k.offset);
                    apply_slope(px, &k.slope);
                    if k.apply_gamma {
                        apply_lin_contrast(px, &k.gamma, k.pivot);
                    }
                    apply_saturation(px, k.saturation);
                    apply_clamp(px, k.clamp_black, k.clamp_white);
                }
            }
            (GradingStyle::Lin, false) => {
                for px in pixels.chunks_exact_mut(4) {
                    apply_clamp(px, k.clamp_black, k.clamp_white);
                    apply_saturation(px, k.saturation);
                    if k.apply_gamma {
                        apply_lin_contrast(px, &k.gamma, k.pivot);
                    }
                    apply_slope(px, &k.slope);
                    apply_offset(px, &k.offset);
                }
            }
            (GradingStyle::Video, true) => {
                for px in pixels.chunks_exact_mut(4) {
                    apply_offset(px, &k.offset);
                    apply_contrast(px, &k.slope, k.pivot_black);
                    if k.apply_gamma {
                        apply_gamma(px, &k.gamma, k.pivot_black, k.pivot_white);
                    }
                    apply_saturation(px, k.saturation);
                    apply_clamp(px, k.clamp_black, k.clamp_white);
                }
            }
            (GradingStyle::Video, false) => {
                for px in pixels.chunks_exact_mut(4) {
                    apply_clamp(px, k.clamp_black, k.clamp_white);
                    apply_saturation(px, k.saturation);
                    if k.apply_gamma {
                        apply_gamma(px, &k.gamma, k.pivot_black, k.pivot_white);
                    }
                    apply_contrast(px, &k.slope, k.pivot_black);
                    apply_offset(px, &k.offset);
                }
            }
        }
    }
}

/// Brightness code-value scale: 6.25 / 1023.
const BRIGHTNESS_SCALE: f64 = 6.25 / 1023.0;

fn build_constants(style: GradingStyle, forward: bool, v: &GradingPrimary) -> PrimaryConstants {
    let sign = if forward { 1.0 } else { -1.0 };
    let mut offset = [0.0f32; 3];
    let mut slope = [1.0f32; 3];
    let mut gamma = [1.0f32; 3];
    let mut pivot = 0.0f32;

    match style {
        GradingStyle::Log => {
            let b = v.brightness.sums();
            let c = v.contrast.products();
            let g = v.gamma.products();
            for i in 0..3 {
                offset[i] = (sign * b[i] * BRIGHTNESS_SCALE) as f32;
                let ci = if forward {
                    c[i]
                } else if c[i] == 0.0 {
                    1.0
                } else {
                    1.0 / c[i]
                };
                slope[i] = ci as f32;
                gamma[i] = (if forward { 1.0 / g[i] } else { g[i] }) as f32;
            }
            pivot = (0.5 + v.pivot * 0.5) as f32;
        }
        GradingStyle::Lin => {
            let o = v.offset.sums();
            let e = v.exposure.sums();
            let c = v.contrast.products();
            for i in 0..3 {
                offset[i] = (sign * o[i]) as f32;
                let ei = (e[i] as f32).exp2();
                slope[i] = if forward { ei } else { 1.0 / ei };
                // The gamma slot carries the contrast exponent here.
                gamma[i] = (if forward { c[i] } else { 1.0 / c[i] }) as f32;
            }
            pivot = (0.18 * v.pivot.exp2()) as f32;
        }
        GradingStyle::Video => {
            let o = v.offset.sums();
            let l = v.lift.sums();
            let gains = v.gain.products();
            let g = v.gamma.products();
            for i in 0..3 {
                offset[i] = (sign * (o[i] + l[i])) as f32;
                let gain = if gains[i] == 0.0 { 1.0 } else { gains[i] };
                let den = v.pivot_white / gain + l[i] - v.pivot_black;
                let den = if den == 0.0 { 1.0 } else { den };
                let s = (v.pivot_white - v.pivot_black) / den;
                slope[i] = (if forward { s } else { 1.0 / s }) as f32;
                gamma[i] = (if forward { 1.0 / g[i] } else { g[i] }) as f32;
            }
        }
    }

    let apply_gamma = gamma != [1.0f32; 3];
    let saturation = (if forward {
        v.saturation
    } else {
        1.0 / v.saturation
    }) as f32;

    let bypass = is_neutral(style, v);

    PrimaryConstants {
        offset,
        slope,
        gamma,
        apply_gamma,
        pivot,
        pivot_black: v.pivot_black as f32,
        pivot_white: v.pivot_white as f32,
        clamp_black: v.clamp_black as f32,
        clamp_white: v.clamp_white as f32,
        saturation,
        bypass,
    }
}

// ============================================================================
// Apply functions
// ============================================================================

#[inline]
fn apply_offset(px: &mut [f32], o: &[f32; 3]) {
    for i in 0..3 {
        px[i] += o[i];
    }
}

#[inline]
fn apply_slope(px: &mut [f32], s: &[f32; 3]) {
    for i in 0..3 {
        px[i] *= s[i];
    }
}

/// `out = (in - pivot) * c + pivot`
#[inline]
fn apply_contrast(px: &mut [f32], c: &[f32; 3], pivot: f32) {
    for i in 0..3 {
        px[i] = (px[i] - pivot) * c[i] + pivot;
    }
}

/// Power around the linear pivot, mirrored for negatives:
/// `out = pow(|in / pivot|, c) * sign(in) * pivot`
#[inline]
fn apply_lin_contrast(px: &mut [f32], c: &[f32; 3], pivot: f32) {
    for i in 0..3 {
        px[i] = (px[i] / pivot).abs().powf(c[i]) * pivot.copysign(px[i]);
    }
}

/// Power between the pivots, mirrored below the black pivot:
/// `out = pow(|in - bp| / (wp - bp), g) * sign(in - bp) * (wp - bp) + bp`
#[inline]
fn apply_gamma(px: &mut [f32], g: &[f32; 3], black: f32, white: f32) {
    let range = white - black;
    for i in 0..3 {
        let shifted = px[i] - black;
        let normalized = (shifted.abs() / range).powf(g[i]);
        px[i] = normalized * range.copysign(shifted) + black;
    }
}

#[inline]
fn apply_saturation(px: &mut [f32], sat: f32) {
    if sat == 1.0 {
        return;
    }
    let luma = px[0] * REC709_LUMA[0] + px[1] * REC709_LUMA[1] + px[2] * REC709_LUMA[2];
    for i in 0..3 {
        px[i] = luma + sat * (px[i] - luma);
    }
}

/// Clamp that lets NaN through; only ordered comparisons move a value.
#[inline]
fn apply_clamp(px: &mut [f32], black: f32, white: f32) {
    for i in 0..3 {
        if px[i] < black {
            px[i] = black;
        } else if px[i] > white {
            px[i] = white;
        }
    }
}
