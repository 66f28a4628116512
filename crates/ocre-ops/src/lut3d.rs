//! 3D LUT op: cubic grid lookup with trilinear or tetrahedral interpolation.
//!
//! Reference: OCIO ops/lut3d/Lut3DOpData.cpp, Lut3DOpCPU.cpp
//!
//! The table stores RGB triples on an `N x N x N` grid with the blue index
//! varying fastest. Inputs clamp to the grid; a NaN input channel zeroes the
//! corresponding output channel while the others still compute. Alpha passes
//! through unchanged, NaN included.
//!
//! An inverse-direction LUT renders through a per-sample search (EXACT) or is
//! replaced by a forward LUT sampled from that search (FAST) during
//! optimization.

use std::hash::{Hash, Hasher};

use ocre_core::BitDepth;

use crate::error::{OpError, OpResult};
use crate::lut1d::InverseQuality;
use crate::metadata::FormatMetadata;
use crate::op::Direction;

/// Smallest and largest supported grid edge.
pub const MIN_GRID_SIZE: usize = 2;
pub const MAX_GRID_SIZE: usize = 129;

/// Grid edge used when replacing an inverse 3D LUT with a forward one.
pub const FAST_INVERSE_3D_SIZE: usize = 33;

/// Interpolation over the unit cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// 8-corner blend.
    #[default]
    Trilinear,
    /// 4-vertex blend over one of six tetrahedra; bit-reproducible.
    Tetrahedral,
}

/// 3D LUT op parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut3dOpData {
    /// RGB triples, blue index fastest: `3 * size^3` values.
    pub table: Vec<f32>,
    /// Grid edge length.
    pub size: usize,
    pub interpolation: Interpolation,
    pub direction: Direction,
    pub inverse_quality: InverseQuality,
    /// Bit depth the file writer should quantize to.
    pub file_out_depth: Option<BitDepth>,
    /// Opaque metadata for file-format round trips.
    pub metadata: FormatMetadata,
}

impl Lut3dOpData {
    /// An identity grid of the given edge length.
    pub fn identity(size: usize) -> Self {
        let n1 = (size - 1) as f32;
        let mut table = Vec::with_capacity(size * size * size * 3);
        for r in 0..size {
            for g in 0..size {
                for b in 0..size {
                    table.push(r as f32 / n1);
                    table.push(g as f32 / n1);
                    table.push(b as f32 / n1);
                }
            }
        }
        Self::from_table(table, size)
    }

    /// Builds from a blue-fastest table.
    pub fn from_table(table: Vec<f32>, size: usize) -> Self {
        Self {
            table,
            size,
            interpolation: Interpolation::default(),
            direction: Direction::Forward,
            inverse_quality: InverseQuality::Exact,
            file_out_depth: None,
            metadata: FormatMetadata::new(),
        }
    }

    /// Checks the grid is cubic and within the supported edge range.
    pub fn validate(&self) -> OpResult<()> {
        if self.size < MIN_GRID_SIZE || self.size > MAX_GRID_SIZE {
            return Err(OpError::structural(
                "Lut3D",
                format!(
                    "grid size {} outside supported range [{MIN_GRID_SIZE}, {MAX_GRID_SIZE}]",
                    self.size
                ),
            ));
        }
        let expected = self.size * self.size * self.size * 3;
        if self.table.len() != expected {
            return Err(OpError::structural(
                "Lut3D",
                format!(
                    "table length {} does not match size {} (expected {expected})",
                    self.table.len(),
                    self.size
                ),
            ));
        }
        Ok(())
    }

    /// True when every grid point sits on the identity lattice within a small
    /// tolerance.
    pub fn is_identity(&self) -> bool {
        const TOL: f32 = 1e-6;
        let n1 = (self.size - 1) as f32;
        let mut i = 0;
        for r in 0..self.size {
            for g in 0..self.size {
                for b in 0..self.size {
                    let expect = [r as f32 / n1, g as f32 / n1, b as f32 / n1];
                    for c in 0..3 {
                        if (self.table[i + c] - expect[c]).abs() > TOL {
                            return false;
                        }
                    }
                    i += 3;
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

    /// Builds the FAST replacement for an inverse LUT: a forward grid sampled
    /// from the exact inverse search.
    pub fn fast_inverse(&self) -> OpResult<Lut3dOpData> {
        if self.direction != Direction::Inverse {
            return Err(OpError::structural(
                "Lut3D",
                "fast_inverse requires an inverse-direction LUT",
            ));
        }
        let search = InverseSearch::new(self);
        let size = FAST_INVERSE_3D_SIZE;
        let n1 = (size - 1) as f32;
        let mut table = Vec::with_capacity(size * size * size * 3);
        for r in 0..size {
            for g in 0..size {
                for b in 0..size {
                    let target = [r as f32 / n1, g as f32 / n1, b as f32 / n1];
                    let x = search.solve(target);
                    table.extend_from_slice(&x);
                }
            }
        }
        let mut out = Lut3dOpData::from_table(table, size);
        out.interpolation = self.interpolation;
        out.file_out_depth = self.file_out_depth;
        Ok(out)
    }

    /// Canonical id: hashes the table so distinct LUTs never collide.
    pub fn cache_id(&self) -> String {
        let mut hasher = std::hash::DefaultHasher::new();
        for &v in &self.table {
            v.to_bits().hash(&mut hasher);
        }
        format!(
            "Lut3D size={} interp={:?} dir={} quality={:?} table={:016x}",
            self.size,
            self.interpolation,
            self.direction,
            self.inverse_quality,
            hasher.finish()
        )
    }
}

// ============================================================================
// CPU kernel
// ============================================================================

/// Grid accessor shared by the forward paths and the inverse search.
#[derive(Debug, Clone)]
struct Grid {
    table: Vec<f32>,
    size: usize,
}

impl Grid {
    #[inline]
    fn at(&self, r: usize, g: usize, b: usize) -> [f32; 3] {
        let idx = ((r * self.size + g) * self.size + b) * 3;
        [self.table[idx], self.table[idx + 1], self.table[idx + 2]]
    }

    /// Clamped cell coordinates and fractional offsets for one input triple.
    /// NaN coordinates resolve to grid zero.
    #[inline]
    fn locate(&self, rgb: [f32; 3]) -> ([usize; 3], [f32; 3]) {
        let n1 = (self.size - 1) as f32;
        let mut idx = [0usize; 3];
        let mut frac = [0f32; 3];
        for c in 0..3 {
            let v = rgb[c];
            let scaled = if v.is_nan() { 0.0 } else { (v * n1).clamp(0.0, n1) };
            let base = (scaled as usize).min(self.size - 2);
            idx[c] = base;
            frac[c] = scaled - base as f32;
        }
        (idx, frac)
    }

    fn trilinear(&self, rgb: [f32; 3]) -> [f32; 3] {
        let ([r, g, b], [fr, fg, fb]) = self.locate(rgb);
        let mut out = [0f32; 3];
        for c in 0..3 {
            let c000 = self.at(r, g, b)[c];
            let c001 = self.at(r, g, b + 1)[c];
            let c010 = self.at(r, g + 1, b)[c];
            let c011 = self.at(r, g + 1, b + 1)[c];
            let c100 = self.at(r + 1, g, b)[c];
            let c101 = self.at(r + 1, g, b + 1)[c];
            let c110 = self.at(r + 1, g + 1, b)[c];
            let c111 = self.at(r + 1, g + 1, b + 1)[c];
            let c00 = c000 + fb * (c001 - c000);
            let c01 = c010 + fb * (c011 - c010);
            let c10 = c100 + fb * (c101 - c100);
            let c11 = c110 + fb * (c111 - c110);
            let c0 = c00 + fg * (c01 - c00);
            let c1 = c10 + fg * (c11 - c10);
            out[c] = c0 + fr * (c1 - c0);
        }
        out
    }

    /// Tetrahedral interpolation. The branch order fixes the evaluation order
    /// so results are bit-for-bit reproducible.
    fn tetrahedral(&self, rgb: [f32; 3]) -> [f32; 3] {
        let ([r, g, b], [fr, fg, fb]) = self.locate(rgb);
        let c000 = self.at(r, g, b);
        let c111 = self.at(r + 1, g + 1, b + 1);
        let mut out = [0f32; 3];

        if fr > fg {
            if fg > fb {
                // fr > fg > fb
                let c100 = self.at(r + 1, g, b);
                let c110 = self.at(r + 1, g + 1, b);
                for c in 0..3 {
                    out[c] = c000[c]
                        + fr * (c100[c] - c000[c])
                        + fg * (c110[c] - c100[c])
                        + fb * (c111[c] - c110[c]);
                }
            } else if fr > fb {
                // fr > fb >= fg
                let c100 = self.at(r + 1, g, b);
                let c101 = self.at(r + 1, g, b + 1);
                for c in 0..3 {
                    out[c] = c000[c]
                        + fr * (c100[c] - c000[c])
                        + fb * (c101[c] - c100[c])
                        + fg * (c111[c] - c101[c]);
                }
            } else {
                // fb >= fr > fg
                let c001 = self.at(r, g, b + 1);
                let c101 = self.at(r + 1, g, b + 1);
                for c in 0..3 {
                    out[c] = c000[c]
                        + fb * (c001[c] - c000[c])
                        + fr * (c101[c] - c001[c])
                        + fg * (c111[c] - c101[c]);
                }
            }
        } else if fb > fg {
            // fb > fg >= fr
            let c001 = self.at(r, g, b + 1);
            let c011 = self.at(r, g + 1, b + 1);
            for c in 0..3 {
                out[c] = c000[c]
                    + fb * (c001[c] - c000[c])
                    + fg * (c011[c] - c001[c])
                    + fr * (c111[c] - c011[c]);
            }
        } else if fb > fr {
            // fg >= fb > fr
            let c010 = self.at(r, g + 1, b);
            let c011 = self.at(r, g + 1, b + 1);
            for c in 0..3 {
                out[c] = c000[c]
                    + fg * (c010[c] - c000[c])
                    + fb * (c011[c] - c010[c])
                    + fr * (c111[c] - c011[c]);
            }
        } else {
            // fg >= fr >= fb
            let c010 = self.at(r, g + 1, b);
            let c110 = self.at(r + 1, g + 1, b);
            for c in 0..3 {
                out[c] = c000[c]
                    + fg * (c010[c] - c000[c])
                    + fr * (c110[c] - c010[c])
                    + fb * (c111[c] - c110[c]);
            }
        }
        out
    }

    fn eval(&self, rgb: [f32; 3], interp: Interpolation) -> [f32; 3] {
        match interp {
            Interpolation::Trilinear => self.trilinear(rgb),
            Interpolation::Tetrahedral => self.tetrahedral(rgb),
        }
    }
}

/// Damped Gauss-Newton search for a preimage under the forward grid.
#[derive(Debug, Clone)]
struct InverseSearch {
    grid: Grid,
    interp: Interpolation,
}

impl InverseSearch {
    fn new(data: &Lut3dOpData) -> Self {
        Self {
            grid: Grid {
                table: data.table.clone(),
                size: data.size,
            },
            interp: data.interpolation,
        }
    }

    fn error(&self, x: [f32; 3], target: [f32; 3]) -> f32 {
        let y = self.grid.eval(x, self.interp);
        (0..3).map(|c| (y[c] - target[c]).powi(2)).sum()
    }

    /// Finds grid coordinates in [0, 1] whose forward image is closest to
    /// `target`. Seeds from the nearest grid point, then refines with finite
    /// differences.
    fn solve(&self, target: [f32; 3]) -> [f32; 3] {
        let n = self.grid.size;
        let n1 = (n - 1) as f32;

        // Seed: grid point with the closest forward value.
        let mut best = [0f32; 3];
        let mut best_err = f32::INFINITY;
        for r in 0..n {
            for g in 0..n {
                for b in 0..n {
                    let out = self.grid.at(r, g, b);
                    let err: f32 = (0..3).map(|c| (out[c] - target[c]).powi(2)).sum();
                    if err < best_err {
                        best_err = err;
                        best = [r as f32 / n1, g as f32 / n1, b as f32 / n1];
                    }
                }
            }
        }

        // Coordinate descent with a shrinking step; robust against the
        // piecewise-linear kinks that defeat a plain Newton iteration.
        let mut x = best;
        let mut step = 1.0 / n1;
        for _ in 0..32 {
            let mut improved = false;
            for c in 0..3 {
                for dir in [-1.0f32, 1.0] {
                    let mut cand = x;
                    cand[c] = (cand[c] + dir * step).clamp(0.0, 1.0);
                    let err = self.error(cand, target);
                    if err < best_err {
                        best_err = err;
                        x = cand;
                        improved = true;
                    }
                }
            }
            if !improved {
                step *= 0.5;
                if step < 1e-7 {
                    break;
                }
            }
        }
        x
    }
}

/// Per-sample evaluation strategy.
#[derive(Debug, Clone)]
enum Lut3dPath {
    Forward(Grid, Interpolation),
    Inverse(InverseSearch),
}

/// Prepared 3D LUT kernel over packed RGBA f32 pixels.
#[derive(Debug, Clone)]
pub struct Lut3dKernel {
    path: Lut3dPath,
}

impl Lut3dKernel {
    pub fn new(data: &Lut3dOpData) -> OpResult<Self> {
        data.validate()?;
        let path = match data.direction {
            Direction::Forward => Lut3dPath::Forward(
                Grid {
                    table: data.table.clone(),
                    size: data.size,
                },
                data.interpolation,
            ),
            Direction::Inverse => Lut3dPath::Inverse(InverseSearch::new(data)),
        };
        Ok(Self { path })
    }

    /// Applies to a packed RGBA buffer in place. Alpha passes through.
    pub fn apply_rgba(&self, pixels: &mut [f32]) {
        debug_assert!(pixels.len() % 4 == 0);
        for chunk in pixels.chunks_exact_mut(4) {
            let rgb = [chunk[0], chunk[1], chunk[2]];
            let mut out = match &self.path {
                Lut3dPath::Forward(grid, interp) => grid.eval(rgb, *interp),
                Lut3dPath::Inverse(search) => search.solve([
                    if rgb[0].is_nan() { 0.0 } else { rgb[0] },
                    if rgb[1].is_nan() { 0.0 } else { rgb[1] },
                    if rgb[2].is_nan() { 0.0 } else { rgb[2] },
                ]),
            };
            for c in 0..3 {
                if rgb[c].is_nan() {
                    out[c] = 0.0;
                }
            }
            chunk[0] = out[0];
            chunk[1] = out[1];
            chunk[2] = out[2];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    /// A well-behaved non-identity grid: per-channel gamma plus a slight mix.
    fn test_lut(size: usize) -> Lut3dOpData {
        let n1 = (size - 1) as f32;
        let mut table = Vec::new();
        for r in 0..size {
            for g in 0..size {
                for b in 0..size {
                    let rf = r as f32 / n1;
                    let gf = g as f32 / n1;
                    let bf = b as f32 / n1;
                    table.push(0.9 * rf.powf(1.5) + 0.1 * gf);
                    table.push(0.9 * gf.powf(1.2) + 0.1 * bf);
                    table.push(0.9 * bf.powf(0.8) + 0.1 * rf);
                }
            }
        }
        Lut3dOpData::from_table(table, size)
    }

    #[test]
    fn identity_detected() {
        assert!(Lut3dOpData::identity(5).is_identity());
        assert!(!test_lut(5).is_identity());
    }

    #[test]
    fn corners_are_exact() {
        let data = test_lut(4);
        for interp in [Interpolation::Trilinear, Interpolation::Tetrahedral] {
            let mut d = data.clone();
            d.interpolation = interp;
            let k = Lut3dKernel::new(&d).unwrap();
            let n1 = 3.0f32;
            for r in 0..4usize {
                for g in 0..4usize {
                    for b in 0..4usize {
                        let mut px = [r as f32 / n1, g as f32 / n1, b as f32 / n1, 1.0];
                        let idx = ((r * 4 + g) * 4 + b) * 3;
                        let expect = [d.table[idx], d.table[idx + 1], d.table[idx + 2]];
                        k.apply_rgba(&mut px);
                        for c in 0..3 {
                            assert!((px[c] - expect[c]).abs() < EPSILON);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn interpolation_modes_agree_on_identity() {
        let mut tri = Lut3dOpData::identity(9);
        tri.interpolation = Interpolation::Trilinear;
        let mut tet = Lut3dOpData::identity(9);
        tet.interpolation = Interpolation::Tetrahedral;
        let kt = Lut3dKernel::new(&tri).unwrap();
        let kh = Lut3dKernel::new(&tet).unwrap();

        for rgb in [[0.13f32, 0.62, 0.41], [0.9, 0.1, 0.5]] {
            let mut a = [rgb[0], rgb[1], rgb[2], 1.0];
            kt.apply_rgba(&mut a);
            let mut b = [rgb[0], rgb[1], rgb[2], 1.0];
            kh.apply_rgba(&mut b);
            for c in 0..3 {
                assert!((a[c] - rgb[c]).abs() < EPSILON);
                assert!((b[c] - rgb[c]).abs() < EPSILON);
            }
        }
    }

    #[test]
    fn tetrahedral_is_reproducible() {
        let mut data = test_lut(7);
        data.interpolation = Interpolation::Tetrahedral;
        let k = Lut3dKernel::new(&data).unwrap();
        let mut a = [0.3, 0.7, 0.2, 1.0];
        let mut b = a;
        k.apply_rgba(&mut a);
        k.apply_rgba(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn out_of_domain_clamps() {
        let data = test_lut(5);
        let k = Lut3dKernel::new(&data).unwrap();
        let mut lo = [-1.0, -1.0, -1.0, 1.0];
        let mut zero = [0.0, 0.0, 0.0, 1.0];
        k.apply_rgba(&mut lo);
        k.apply_rgba(&mut zero);
        assert_eq!(&lo[..3], &zero[..3]);

        let mut hi = [2.0, 2.0, 2.0, 1.0];
        let mut one = [1.0, 1.0, 1.0, 1.0];
        k.apply_rgba(&mut hi);
        k.apply_rgba(&mut one);
        assert_eq!(&hi[..3], &one[..3]);
    }

    #[test]
    fn nan_zeroes_its_channel_only() {
        let data = test_lut(5);
        let k = Lut3dKernel::new(&data).unwrap();
        let mut px = [f32::NAN, 0.5, 0.5, f32::NAN];
        k.apply_rgba(&mut px);
        assert_eq!(px[0], 0.0);
        assert!(px[1].is_finite());
        assert!(px[2].is_finite());
        assert!(px[3].is_nan()); // alpha untouched

        // The other channels see the NaN coordinate clamped to zero.
        let mut reference = [0.0, 0.5, 0.5, 1.0];
        k.apply_rgba(&mut reference);
        assert_eq!(px[1], reference[1]);
        assert_eq!(px[2], reference[2]);
    }

    #[test]
    fn exact_inverse_round_trip() {
        let data = test_lut(5);
        let fwd = Lut3dKernel::new(&data).unwrap();
        let inv = Lut3dKernel::new(&data.inverse()).unwrap();

        for rgb in [[0.2f32, 0.5, 0.7], [0.8, 0.3, 0.1], [0.5, 0.5, 0.5]] {
            let mut px = [rgb[0], rgb[1], rgb[2], 1.0];
            fwd.apply_rgba(&mut px);
            inv.apply_rgba(&mut px);
            for c in 0..3 {
                assert!((px[c] - rgb[c]).abs() < 5e-3, "{px:?} vs {rgb:?}");
            }
        }
    }

    #[test]
    fn fast_inverse_approximates_exact() {
        let data = test_lut(5).inverse();
        let fast_lut = data.fast_inverse().unwrap();
        assert_eq!(fast_lut.size, FAST_INVERSE_3D_SIZE);
        assert_eq!(fast_lut.direction, Direction::Forward);

        let exact = Lut3dKernel::new(&data).unwrap();
        let fast = Lut3dKernel::new(&fast_lut).unwrap();
        for rgb in [[0.3f32, 0.4, 0.5], [0.7, 0.2, 0.6]] {
            let mut a = [rgb[0], rgb[1], rgb[2], 1.0];
            exact.apply_rgba(&mut a);
            let mut b = [rgb[0], rgb[1], rgb[2], 1.0];
            fast.apply_rgba(&mut b);
            for c in 0..3 {
                assert!((a[c] - b[c]).abs() < 2e-2, "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn validation_rejects_non_cubic() {
        let mut data = Lut3dOpData::identity(4);
        data.table.pop();
        assert!(data.validate().is_err());

        let data = Lut3dOpData::identity(2);
        assert!(data.validate().is_ok());
    }
}
