//! 1D LUT op: per-channel lookup with linear interpolation.
//!
//! Reference: OCIO ops/lut1d/Lut1DOpData.cpp, Lut1DOpCPU.cpp
//!
//! The table is stored interleaved (RGB per entry). Two domains exist:
//!
//! * standard: `size` entries spanning [0, 1], interpolated;
//! * half-domain: exactly 65536 entries indexed by the bit pattern of the
//!   input reinterpreted as a 16-bit half. No interpolation; NaN inputs land
//!   in the table's NaN bucket, infinities and denormals fall out of the half
//!   encoding.
//!
//! An inverse-direction LUT renders through a search over the forward table
//! (EXACT) or is replaced by a resampled forward LUT (FAST) during
//! optimization.

use std::hash::{Hash, Hasher};

use ocre_core::BitDepth;
use ocre_math::{f32_to_half_bits, half_bits_to_f32};

use crate::error::{OpError, OpResult};
use crate::metadata::FormatMetadata;
use crate::op::Direction;
use crate::range::RangeOpData;

/// Number of entries in a half-domain table.
pub const HALF_DOMAIN_SIZE: usize = 65536;

/// Resample size used when replacing an inverse 1D LUT with a forward one.
pub const FAST_INVERSE_1D_SIZE: usize = 65536;

/// Inverse rendering quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InverseQuality {
    /// Search the forward table per sample.
    #[default]
    Exact,
    /// Allow the optimizer to substitute a resampled forward LUT.
    Fast,
}

/// Hue preservation mode applied after the per-channel lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HueAdjust {
    #[default]
    None,
    /// Renormalize the mid channel so the input hue survives a tonal curve.
    Dw3,
}

/// 1D LUT op parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut1dOpData {
    /// Interleaved RGB entries, `3 * size` values.
    pub table: Vec<f32>,
    /// Entries per channel.
    pub size: usize,
    /// Index by half bit-pattern instead of interpolating over [0, 1].
    pub half_domain: bool,
    pub hue_adjust: HueAdjust,
    pub direction: Direction,
    pub inverse_quality: InverseQuality,
    /// Bit depth the file writer should quantize to.
    pub file_out_depth: Option<BitDepth>,
    /// Opaque metadata for file-format round trips.
    pub metadata: FormatMetadata,
}

impl Lut1dOpData {
    /// An identity ramp of the given size.
    pub fn identity(size: usize) -> Self {
        let mut table = Vec::with_capacity(size * 3);
        for i in 0..size {
            let v = i as f32 / (size - 1) as f32;
            table.extend_from_slice(&[v, v, v]);
        }
        Self::from_interleaved(table, size)
    }

    /// Builds from an interleaved RGB table.
    pub fn from_interleaved(table: Vec<f32>, size: usize) -> Self {
        Self {
            table,
            size,
            half_domain: false,
            hue_adjust: HueAdjust::None,
            direction: Direction::Forward,
            inverse_quality: InverseQuality::Exact,
            file_out_depth: None,
            metadata: FormatMetadata::new(),
        }
    }

    /// Builds from a single curve applied to all three channels.
    pub fn from_channel(curve: &[f32]) -> Self {
        let mut table = Vec::with_capacity(curve.len() * 3);
        for &v in curve {
            table.extend_from_slice(&[v, v, v]);
        }
        Self::from_interleaved(table, curve.len())
    }

    /// A half-domain identity: entry `i` holds the half value with bits `i`.
    pub fn identity_half_domain() -> Self {
        let mut table = Vec::with_capacity(HALF_DOMAIN_SIZE * 3);
        for i in 0..HALF_DOMAIN_SIZE {
            let v = half_bits_to_f32(i as u16);
            table.extend_from_slice(&[v, v, v]);
        }
        let mut data = Self::from_interleaved(table, HALF_DOMAIN_SIZE);
        data.half_domain = true;
        data
    }

    /// Checks table shape against the domain.
    pub fn validate(&self) -> OpResult<()> {
        if self.half_domain && self.size != HALF_DOMAIN_SIZE {
            return Err(OpError::structural(
                "Lut1D",
                format!("half-domain LUT must have {HALF_DOMAIN_SIZE} entries, got {}", self.size),
            ));
        }
        if self.size < 2 {
            return Err(OpError::structural(
                "Lut1D",
                format!("LUT must have at least 2 entries, got {}", self.size),
            ));
        }
        if self.table.len() != self.size * 3 {
            return Err(OpError::structural(
                "Lut1D",
                format!(
                    "table length {} does not match size {} (expected {})",
                    self.table.len(),
                    self.size,
                    self.size * 3
                ),
            ));
        }
        Ok(())
    }

    /// True when every entry sits on the identity ramp within a small
    /// tolerance. Half-domain tables compare against the half values
    /// themselves; non-finite buckets are ignored.
    pub fn is_identity(&self) -> bool {
        const TOL: f32 = 1e-6;
        for i in 0..self.size {
            let expect = if self.half_domain {
                let v = half_bits_to_f32(i as u16);
                if !v.is_finite() {
                    continue;
                }
                v
            } else {
                i as f32 / (self.size - 1) as f32
            };
            for c in 0..3 {
                if (self.table[i * 3 + c] - expect).abs() > TOL {
                    return false;
                }
            }
        }
        true
    }

    /// The inverse op (same table, opposite direction).
    pub fn inverse(&self) -> Self {
        Self {
            direction: self.direction.invert(),
            ..self.clone()
        }
    }

    /// Resamples `self` then `other` into a single forward LUT.
    ///
    /// Both ops must render forward and be free of hue adjustment; the result
    /// keeps `self`'s domain and takes the larger of the two sizes.
    pub fn compose(&self, other: &Self) -> OpResult<Self> {
        if self.direction != Direction::Forward || other.direction != Direction::Forward {
            return Err(OpError::structural(
                "Lut1D",
                "compose requires both LUTs to be forward",
            ));
        }
        if self.hue_adjust != HueAdjust::None || other.hue_adjust != HueAdjust::None {
            return Err(OpError::structural(
                "Lut1D",
                "compose cannot preserve hue adjustment",
            ));
        }
        let size = self.size.max(other.size);
        let first = if size == self.size {
            self.clone()
        } else {
            self.resample(size)
        };
        let second = Lut1dKernel::new(other)?;

        let mut table = first.table;
        second.apply_rgb_inplace(&mut table);

        let mut out = Self::from_interleaved(table, size);
        out.half_domain = self.half_domain;
        out.file_out_depth = other.file_out_depth;
        Ok(out)
    }

    /// Resamples the standard-domain table at a new size.
    fn resample(&self, size: usize) -> Self {
        let kernel = Lut1dEval::forward(self);
        let mut table = Vec::with_capacity(size * 3);
        for i in 0..size {
            let x = i as f32 / (size - 1) as f32;
            for c in 0..3 {
                table.push(kernel.eval(x, c));
            }
        }
        let mut out = Self::from_interleaved(table, size);
        out.file_out_depth = self.file_out_depth;
        out
    }

    /// Builds the FAST replacement for an inverse LUT: a range mapping the
    /// forward table's output span to [0, 1], followed by a forward LUT
    /// resampled from the exact inverse.
    pub fn fast_inverse(&self) -> OpResult<(RangeOpData, Lut1dOpData)> {
        if self.direction != Direction::Inverse {
            return Err(OpError::structural(
                "Lut1D",
                "fast_inverse requires an inverse-direction LUT",
            ));
        }
        let inv = InverseEval::new(self);

        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;
        for &v in &self.table {
            if v.is_finite() {
                lo = lo.min(v);
                hi = hi.max(v);
            }
        }
        if !(lo < hi) {
            return Err(OpError::uninvertible("Lut1D", "table has no output span"));
        }

        let range = RangeOpData::new(lo as f64, hi as f64, 0.0, 1.0);

        let size = FAST_INVERSE_1D_SIZE;
        let mut table = Vec::with_capacity(size * 3);
        for i in 0..size {
            let y = lo + (hi - lo) * i as f32 / (size - 1) as f32;
            for c in 0..3 {
                table.push(inv.eval(y, c));
            }
        }
        Ok((range, Lut1dOpData::from_interleaved(table, size)))
    }

    /// Canonical id: hashes the table so distinct LUTs never collide with
    /// each other's parameters.
    pub fn cache_id(&self) -> String {
        let mut hasher = std::hash::DefaultHasher::new();
        for &v in &self.table {
            v.to_bits().hash(&mut hasher);
        }
        format!(
            "Lut1D size={} half={} hue={:?} dir={} quality={:?} table={:016x}",
            self.size,
            self.half_domain,
            self.hue_adjust,
            self.direction,
            self.inverse_quality,
            hasher.finish()
        )
    }
}

// ============================================================================
// Order3
// ============================================================================

/// Branchless min/mid/max channel ordering. NaNs compare false everywhere and
/// fall into the `val = 3` bucket, so the result is always a permutation.
const ORDER3_TABLE: [usize; 12] = [2, 1, 0, 2, 1, 0, 2, 1, 2, 0, 1, 2];

/// Returns channel indices `(min, mid, max)` with `v[max] >= v[mid] >= v[min]`
/// for finite inputs and a deterministic permutation otherwise.
pub fn order3(r: f32, g: f32, b: f32) -> (usize, usize, usize) {
    let val = (r > g) as usize * 5 + (g > b) as usize * 4 + 3 - (r > b) as usize * 3;
    (
        ORDER3_TABLE[val + 2],
        ORDER3_TABLE[val + 1],
        ORDER3_TABLE[val],
    )
}

// ============================================================================
// CPU kernel
// ============================================================================

/// Forward evaluation over the standard or half domain.
#[derive(Debug, Clone)]
struct Lut1dEval {
    table: Vec<f32>,
    size: usize,
    half_domain: bool,
}

impl Lut1dEval {
    fn forward(data: &Lut1dOpData) -> Self {
        Self {
            table: data.table.clone(),
            size: data.size,
            half_domain: data.half_domain,
        }
    }

    #[inline]
    fn eval(&self, v: f32, channel: usize) -> f32 {
        if self.half_domain {
            let idx = f32_to_half_bits(v) as usize;
            return self.table[idx * 3 + channel];
        }
        if v.is_nan() {
            return 0.0;
        }
        let scaled = (v * (self.size - 1) as f32).clamp(0.0, (self.size - 1) as f32);
        let lo = scaled as usize;
        let hi = (lo + 1).min(self.size - 1);
        let t = scaled - lo as f32;
        let a = self.table[lo * 3 + channel];
        let b = self.table[hi * 3 + channel];
        a + t * (b - a)
    }
}

/// Exact inverse evaluation: per channel, the principal monotonic segment of
/// the forward table (the one containing the domain midpoint) is searched.
/// Flat spots resolve to their left edge.
#[derive(Debug, Clone)]
struct InverseEval {
    table: Vec<f32>,
    size: usize,
    /// Per channel: segment bounds and orientation.
    segments: [InverseSegment; 3],
}

#[derive(Debug, Clone, Copy)]
struct InverseSegment {
    lo: usize,
    hi: usize,
    increasing: bool,
}

impl InverseEval {
    fn new(data: &Lut1dOpData) -> Self {
        let channel = |c: usize| find_principal_segment(&data.table, data.size, c);
        Self {
            table: data.table.clone(),
            size: data.size,
            segments: [channel(0), channel(1), channel(2)],
        }
    }

    #[inline]
    fn value(&self, idx: usize, channel: usize) -> f32 {
        self.table[idx * 3 + channel]
    }

    fn eval(&self, y: f32, channel: usize) -> f32 {
        if y.is_nan() {
            return 0.0;
        }
        let seg = self.segments[channel];
        let n1 = (self.size - 1) as f32;

        // Map a decreasing segment onto the increasing search by negating.
        let sign = if seg.increasing { 1.0f32 } else { -1.0 };
        let y = sign * y;
        let at = |i: usize| sign * self.value(i, channel);

        if y <= at(seg.lo) {
            return seg.lo as f32 / n1;
        }
        if y >= at(seg.hi) {
            return seg.hi as f32 / n1;
        }

        // Smallest index with value >= y; its left neighbor is strictly
        // below, so flat runs resolve to their left edge.
        let mut lo = seg.lo;
        let mut hi = seg.hi;
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if at(mid) >= y {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        let a = at(lo);
        let b = at(hi);
        let t = if b > a { (y - a) / (b - a) } else { 1.0 };
        (lo as f32 + t) / n1
    }
}

/// Finds the maximal monotonic run containing the midpoint index. A fully
/// flat table degenerates to the single midpoint entry.
fn find_principal_segment(table: &[f32], size: usize, channel: usize) -> InverseSegment {
    let at = |i: usize| table[i * 3 + channel];
    let mid = (size - 1) / 2;

    // Orientation from the nearest non-flat neighbor pair around the middle.
    let mut increasing = true;
    let mut found = false;
    for d in 0..size {
        if mid + d + 1 < size && at(mid + d) != at(mid + d + 1) {
            increasing = at(mid + d + 1) > at(mid + d);
            found = true;
            break;
        }
        if mid >= d + 1 && at(mid - d - 1) != at(mid - d) {
            increasing = at(mid - d) > at(mid - d - 1);
            found = true;
            break;
        }
    }
    if !found {
        return InverseSegment {
            lo: mid,
            hi: mid,
            increasing: true,
        };
    }

    let keeps = |a: f32, b: f32| if increasing { b >= a } else { b <= a };
    let mut lo = mid;
    while lo > 0 && keeps(at(lo - 1), at(lo)) {
        lo -= 1;
    }
    let mut hi = mid;
    while hi + 1 < size && keeps(at(hi), at(hi + 1)) {
        hi += 1;
    }
    InverseSegment { lo, hi, increasing }
}

/// Per-sample evaluation strategy.
#[derive(Debug, Clone)]
enum Lut1dPath {
    /// Interpolated or half-domain fetch.
    Forward(Lut1dEval),
    /// Expanded table indexed by integer code value.
    Lookup { table: Vec<f32>, max_code: f32 },
    /// Search over the forward table.
    Inverse(InverseEval),
}

/// Prepared 1D LUT kernel over packed RGBA f32 pixels.
#[derive(Debug, Clone)]
pub struct Lut1dKernel {
    path: Lut1dPath,
    hue_adjust: HueAdjust,
}

impl Lut1dKernel {
    /// Builds the kernel for float input.
    pub fn new(data: &Lut1dOpData) -> OpResult<Self> {
        data.validate()?;
        let path = match data.direction {
            Direction::Forward => Lut1dPath::Forward(Lut1dEval::forward(data)),
            Direction::Inverse => Lut1dPath::Inverse(InverseEval::new(data)),
        };
        Ok(Self {
            path,
            hue_adjust: data.hue_adjust,
        })
    }

    /// Builds the kernel for input known to carry integer code values
    /// normalized to [0, 1]: every code gets a precomputed fetch.
    pub fn with_input_depth(data: &Lut1dOpData, in_depth: BitDepth) -> OpResult<Self> {
        // Wider codes would need a 4-billion-entry table; interpolate instead.
        if in_depth.is_float() || in_depth.bits() > 16 || data.direction == Direction::Inverse {
            return Self::new(data);
        }
        data.validate()?;
        let eval = Lut1dEval::forward(data);
        let max_code = in_depth.max_value() as usize;
        let mut table = Vec::with_capacity((max_code + 1) * 3);
        for code in 0..=max_code {
            let x = code as f32 / max_code as f32;
            for c in 0..3 {
                table.push(eval.eval(x, c));
            }
        }
        Ok(Self {
            path: Lut1dPath::Lookup {
                table,
                max_code: max_code as f32,
            },
            hue_adjust: data.hue_adjust,
        })
    }

    #[inline]
    fn eval(&self, v: f32, channel: usize) -> f32 {
        match &self.path {
            Lut1dPath::Forward(f) => f.eval(v, channel),
            Lut1dPath::Lookup { table, max_code } => {
                // Same NaN policy as the interpolating forward path.
                if v.is_nan() {
                    return 0.0;
                }
                let code = (v * max_code).round().clamp(0.0, *max_code) as usize;
                table[code * 3 + channel]
            }
            Lut1dPath::Inverse(inv) => inv.eval(v, channel),
        }
    }

    /// Applies to a packed RGBA buffer in place. Alpha passes through.
    pub fn apply_rgba(&self, pixels: &mut [f32]) {
        debug_assert!(pixels.len() % 4 == 0);
        for chunk in pixels.chunks_exact_mut(4) {
            self.apply_pixel(chunk);
        }
    }

    /// Applies to tightly packed RGB triples (used when composing tables).
    fn apply_rgb_inplace(&self, rgb: &mut [f32]) {
        debug_assert!(rgb.len() % 3 == 0);
        for chunk in rgb.chunks_exact_mut(3) {
            self.apply_pixel(chunk);
        }
    }

    #[inline]
    fn apply_pixel(&self, px: &mut [f32]) {
        match self.hue_adjust {
            HueAdjust::None => {
                for c in 0..3 {
                    px[c] = self.eval(px[c], c);
                }
            }
            HueAdjust::Dw3 => {
                let (min, mid, max) = order3(px[0], px[1], px[2]);
                let orig_chroma = px[max] - px[min];
                let hue_factor = if orig_chroma == 0.0 {
                    0.0
                } else {
                    (px[mid] - px[min]) / orig_chroma
                };
                for c in 0..3 {
                    px[c] = self.eval(px[c], c);
                }
                let new_chroma = px[max] - px[min];
                px[mid] = hue_factor * new_chroma + px[min];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn gamma_lut(size: usize, g: f32) -> Lut1dOpData {
        let curve: Vec<f32> = (0..size)
            .map(|i| (i as f32 / (size - 1) as f32).powf(g))
            .collect();
        Lut1dOpData::from_channel(&curve)
    }

    #[test]
    fn identity_detected() {
        assert!(Lut1dOpData::identity(17).is_identity());
        assert!(Lut1dOpData::identity_half_domain().is_identity());
        assert!(!gamma_lut(17, 2.2).is_identity());
    }

    #[test]
    fn interpolation_between_entries() {
        let data = Lut1dOpData::identity(3);
        let k = Lut1dKernel::new(&data).unwrap();
        let mut px = [0.25, 0.5, 0.75, 1.0];
        k.apply_rgba(&mut px);
        assert!((px[0] - 0.25).abs() < EPSILON);
        assert!((px[1] - 0.5).abs() < EPSILON);
        assert!((px[2] - 0.75).abs() < EPSILON);
        assert_eq!(px[3], 1.0);
    }

    #[test]
    fn out_of_domain_clamps_and_nan_zeroes() {
        let data = gamma_lut(33, 2.0);
        let k = Lut1dKernel::new(&data).unwrap();
        let mut px = [-0.5, 2.0, f32::NAN, f32::NAN];
        k.apply_rgba(&mut px);
        assert_eq!(px[0], 0.0); // first entry
        assert_eq!(px[1], 1.0); // last entry
        assert_eq!(px[2], 0.0); // NaN policy
        assert!(px[3].is_nan()); // alpha untouched
    }

    #[test]
    fn half_domain_indexes_by_bits() {
        let data = Lut1dOpData::identity_half_domain();
        let k = Lut1dKernel::new(&data).unwrap();
        let mut px = [0.5, -2.0, 65504.0, 1.0];
        k.apply_rgba(&mut px);
        assert_eq!(px[0], 0.5);
        assert_eq!(px[1], -2.0);
        assert_eq!(px[2], 65504.0);
    }

    #[test]
    fn half_domain_nan_bucket() {
        let mut data = Lut1dOpData::identity_half_domain();
        let nan_idx = f32_to_half_bits(f32::NAN) as usize;
        data.table[nan_idx * 3] = 42.0;
        let k = Lut1dKernel::new(&data).unwrap();
        let mut px = [f32::NAN, 0.0, 0.0, 1.0];
        k.apply_rgba(&mut px);
        assert_eq!(px[0], 42.0);
    }

    #[test]
    fn order3_contract() {
        assert_eq!(order3(0.1, 0.5, 0.8), (0, 1, 2));
        assert_eq!(order3(0.8, 0.5, 0.1), (2, 1, 0));
        assert_eq!(order3(0.5, 0.8, 0.1), (2, 0, 1));
        // Ties yield a permutation.
        let (min, mid, max) = order3(0.5, 0.5, 0.5);
        let mut idx = [min, mid, max];
        idx.sort_unstable();
        assert_eq!(idx, [0, 1, 2]);
        // NaN still yields a permutation.
        let (min, mid, max) = order3(f32::NAN, 0.5, 0.1);
        let mut idx = [min, mid, max];
        idx.sort_unstable();
        assert_eq!(idx, [0, 1, 2]);
    }

    #[test]
    fn hue_adjust_preserves_hue_factor() {
        let mut data = gamma_lut(65, 2.2);
        data.hue_adjust = HueAdjust::Dw3;
        let k = Lut1dKernel::new(&data).unwrap();

        let input = [0.1f32, 0.5, 0.8];
        let mut px = [input[0], input[1], input[2], 1.0];
        k.apply_rgba(&mut px);

        let (min, mid, max) = order3(input[0], input[1], input[2]);
        let in_factor = (input[mid] - input[min]) / (input[max] - input[min]);
        let out_factor = (px[mid] - px[min]) / (px[max] - px[min]);
        assert!((in_factor - out_factor).abs() < 1e-5);
    }

    #[test]
    fn exact_inverse_round_trip() {
        let data = gamma_lut(257, 2.2);
        let fwd = Lut1dKernel::new(&data).unwrap();
        let inv = Lut1dKernel::new(&data.inverse()).unwrap();

        for x in [0.0f32, 0.1, 0.18, 0.5, 0.9, 1.0] {
            let mut px = [x, x, x, 1.0];
            fwd.apply_rgba(&mut px);
            inv.apply_rgba(&mut px);
            assert!((px[0] - x).abs() < 1e-4, "x={x} got {}", px[0]);
        }
    }

    #[test]
    fn exact_inverse_flat_spot_returns_left_edge() {
        // Flat run over entries 2..=4 at value 0.5.
        let curve = [0.0f32, 0.25, 0.5, 0.5, 0.5, 0.75, 1.0];
        let data = Lut1dOpData::from_channel(&curve);
        let inv = Lut1dKernel::new(&data.inverse()).unwrap();
        let mut px = [0.5, 0.5, 0.5, 1.0];
        inv.apply_rgba(&mut px);
        assert!((px[0] - 2.0 / 6.0).abs() < EPSILON);
    }

    #[test]
    fn exact_inverse_decreasing_table() {
        let curve: Vec<f32> = (0..33).map(|i| 1.0 - i as f32 / 32.0).collect();
        let data = Lut1dOpData::from_channel(&curve);
        let inv = Lut1dKernel::new(&data.inverse()).unwrap();
        let mut px = [0.25, 0.5, 0.75, 1.0];
        inv.apply_rgba(&mut px);
        assert!((px[0] - 0.75).abs() < EPSILON);
        assert!((px[1] - 0.5).abs() < EPSILON);
        assert!((px[2] - 0.25).abs() < EPSILON);
    }

    #[test]
    fn fast_inverse_matches_exact() {
        let data = gamma_lut(257, 2.2).inverse();
        let exact = Lut1dKernel::new(&data).unwrap();
        let (range, fast_lut) = data.fast_inverse().unwrap();
        let fast = Lut1dKernel::new(&fast_lut).unwrap();
        let range_k = crate::range::RangeKernel::new(&range);

        for y in [0.05f32, 0.2, 0.5, 0.8, 0.95] {
            let mut a = [y, y, y, 1.0];
            exact.apply_rgba(&mut a);
            let mut b = [y, y, y, 1.0];
            range_k.apply_rgba(&mut b);
            fast.apply_rgba(&mut b);
            assert!((a[0] - b[0]).abs() < 1e-4, "y={y} exact={} fast={}", a[0], b[0]);
        }
    }

    #[test]
    fn compose_resamples_at_larger_size() {
        let a = gamma_lut(17, 2.0);
        let b = gamma_lut(65, 0.5);
        let composed = a.compose(&b).unwrap();
        assert_eq!(composed.size, 65);

        let ka = Lut1dKernel::new(&a).unwrap();
        let kb = Lut1dKernel::new(&b).unwrap();
        let kc = Lut1dKernel::new(&composed).unwrap();
        for x in [0.1f32, 0.4, 0.9] {
            let mut seq = [x, x, x, 1.0];
            ka.apply_rgba(&mut seq);
            kb.apply_rgba(&mut seq);
            let mut one = [x, x, x, 1.0];
            kc.apply_rgba(&mut one);
            assert!((seq[0] - one[0]).abs() < 1e-3);
        }
    }

    #[test]
    fn lookup_path_matches_interpolation() {
        let data = gamma_lut(1024, 2.2);
        let interp = Lut1dKernel::new(&data).unwrap();
        let lookup = Lut1dKernel::with_input_depth(&data, BitDepth::U8).unwrap();

        for code in [0u32, 1, 127, 128, 254, 255] {
            let x = code as f32 / 255.0;
            let mut a = [x, x, x, 1.0];
            interp.apply_rgba(&mut a);
            let mut b = [x, x, x, 1.0];
            lookup.apply_rgba(&mut b);
            assert!((a[0] - b[0]).abs() < 1e-6);
        }
    }

    #[test]
    fn lookup_path_nan_matches_forward_path() {
        // A table whose first entry is nonzero distinguishes the NaN policy
        // from an entry-0 fetch.
        let data = Lut1dOpData::from_channel(&[0.5, 0.75, 1.0]);
        let interp = Lut1dKernel::new(&data).unwrap();
        let lookup = Lut1dKernel::with_input_depth(&data, BitDepth::U8).unwrap();

        let mut a = [f32::NAN, 0.5, 0.5, 1.0];
        interp.apply_rgba(&mut a);
        let mut b = [f32::NAN, 0.5, 0.5, 1.0];
        lookup.apply_rgba(&mut b);
        assert_eq!(a[0], b[0]);
        assert_eq!(b[0], 0.0);
    }

    #[test]
    fn validation_rejects_bad_shapes() {
        let mut data = Lut1dOpData::identity(16);
        data.table.pop();
        assert!(data.validate().is_err());

        let mut data = Lut1dOpData::identity(16);
        data.half_domain = true;
        assert!(data.validate().is_err());
    }

    #[test]
    fn cache_id_depends_on_table() {
        let a = Lut1dOpData::identity(16);
        let mut b = Lut1dOpData::identity(16);
        b.table[5] += 0.01;
        assert_ne!(a.cache_id(), b.cache_id());
    }
}
