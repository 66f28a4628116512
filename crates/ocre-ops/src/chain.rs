//! Op chain: validate, finalize, optimize.
//!
//! Reference: OCIO OpOptimizers.cpp, Op.cpp (FinalizeOpVec)
//!
//! Finalization runs the optimization passes selected by
//! [`OptimizationFlags`], in a fixed order: identity replacement, adjacent
//! pair combining, fast LUT inversion, identity stripping. A pair the model
//! cannot combine is left in place; genuine errors (a singular matrix asked
//! to invert) abort finalization.

use std::ops::BitOr;

use tracing::{debug, trace};

use crate::error::OpResult;
use crate::op::{Direction, Op, OpData};

// ============================================================================
// Optimization flags
// ============================================================================

/// Bitset selecting finalization passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizationFlags(u32);

impl OptimizationFlags {
    /// No optimization; ops render exactly as authored.
    pub const NONE: Self = Self(0);
    /// Replace identity ops with their clamp-preserving equivalent, or drop
    /// them when nothing observable remains.
    pub const IDENTITY_REPLACEMENT: Self = Self(1);
    /// Combine adjacent compatible op pairs.
    pub const PAIR_COMBINE: Self = Self(1 << 1);
    /// Replace inverse LUTs with resampled forward approximations.
    pub const LUT_INV_FAST: Self = Self(1 << 2);
    /// Strip leading and trailing identities left over from combining.
    pub const SIMPLIFY_OPS: Self = Self(1 << 3);

    /// Every pass that preserves results bit-exactly.
    pub const LOSSLESS: Self = Self(
        Self::IDENTITY_REPLACEMENT.0 | Self::PAIR_COMBINE.0 | Self::SIMPLIFY_OPS.0,
    );
    /// Lossless passes plus fast LUT inversion.
    pub const DEFAULT: Self = Self(Self::LOSSLESS.0 | Self::LUT_INV_FAST.0);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for OptimizationFlags {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl BitOr for OptimizationFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// ============================================================================
// Op chain
// ============================================================================

/// An ordered sequence of ops applied first to last.
#[derive(Debug, Clone, Default)]
pub struct OpChain {
    ops: Vec<Op>,
}

impl OpChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, op: Op) {
        self.ops.push(op);
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Op> {
        self.ops.iter()
    }

    /// Validates every op's parameters.
    pub fn validate(&self) -> OpResult<()> {
        for op in &self.ops {
            op.validate()?;
        }
        Ok(())
    }

    /// Validates, then runs the passes selected by `flags`.
    pub fn finalize(&mut self, flags: OptimizationFlags) -> OpResult<()> {
        self.validate()?;
        let before = self.ops.len();

        if flags.contains(OptimizationFlags::IDENTITY_REPLACEMENT) {
            self.replace_identities();
        }
        if flags.contains(OptimizationFlags::PAIR_COMBINE) {
            self.combine_pairs()?;
        }
        if flags.contains(OptimizationFlags::LUT_INV_FAST) {
            self.fast_invert_luts()?;
        }
        if flags.contains(OptimizationFlags::SIMPLIFY_OPS) {
            self.strip_edge_identities();
        }

        debug!(before, after = self.ops.len(), "finalized op chain");
        Ok(())
    }

    /// Concatenation of each op's canonical id. Stable across runs, so it
    /// keys processor caches.
    pub fn cache_id(&self) -> String {
        let mut id = String::new();
        for op in &self.ops {
            id.push_str(&op.cache_id());
            id.push('\n');
        }
        id
    }

    // ------------------------------------------------------------------
    // Passes
    // ------------------------------------------------------------------

    fn replace_identities(&mut self) {
        let mut replaced = Vec::with_capacity(self.ops.len());
        for op in self.ops.drain(..) {
            if !op.is_identity() {
                replaced.push(op);
                continue;
            }
            match op.identity_replacement() {
                Some(data) => {
                    trace!(kind = op.data.kind(), "identity op replaced with clamp");
                    replaced.push(Op::new(data));
                }
                None => trace!(kind = op.data.kind(), "identity op dropped"),
            }
        }
        self.ops = replaced;
    }

    fn combine_pairs(&mut self) -> OpResult<()> {
        loop {
            let mut changed = false;
            let mut i = 0;
            while i + 1 < self.ops.len() {
                if !self.ops[i].can_combine_with(&self.ops[i + 1]) {
                    i += 1;
                    continue;
                }
                let combined: Vec<Op> = self.ops[i]
                    .combine_with(&self.ops[i + 1])?
                    .into_iter()
                    .filter_map(|op| {
                        if op.is_identity() {
                            // Same rule as the identity pass: keep only the
                            // observable clamp, if any.
                            op.identity_replacement().map(Op::new)
                        } else {
                            Some(op)
                        }
                    })
                    .collect();
                trace!(
                    first = self.ops[i].data.kind(),
                    second = self.ops[i + 1].data.kind(),
                    result = combined.len(),
                    "combined op pair"
                );
                self.ops.splice(i..i + 2, combined);
                changed = true;
                // Back up one so the new op can combine with its predecessor.
                i = i.saturating_sub(1);
            }
            if !changed {
                return Ok(());
            }
        }
    }

    fn fast_invert_luts(&mut self) -> OpResult<()> {
        let mut out = Vec::with_capacity(self.ops.len());
        for op in self.ops.drain(..) {
            match &op.data {
                OpData::Lut1d(d) if d.direction == Direction::Inverse => {
                    let (range, lut) = d.fast_inverse()?;
                    trace!(size = lut.size, "inverse 1D LUT resampled forward");
                    out.push(Op::new(OpData::Range(range)));
                    out.push(Op::new(OpData::Lut1d(lut)));
                }
                OpData::Lut3d(d) if d.direction == Direction::Inverse => {
                    let lut = d.fast_inverse()?;
                    trace!(size = lut.size, "inverse 3D LUT resampled forward");
                    out.push(Op::new(OpData::Lut3d(lut)));
                }
                _ => out.push(op),
            }
        }
        self.ops = out;
        Ok(())
    }

    fn strip_edge_identities(&mut self) {
        while self.ops.first().is_some_and(Op::is_identity) {
            self.ops.remove(0);
        }
        while self.ops.last().is_some_and(Op::is_identity) {
            self.ops.pop();
        }
    }
}

impl FromIterator<Op> for OpChain {
    fn from_iter<T: IntoIterator<Item = Op>>(iter: T) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdl::CdlOpData;
    use crate::cpu::CpuKernel;
    use crate::gamma::{GammaOpData, GammaStyle};
    use crate::log::LogOpData;
    use crate::lut1d::Lut1dOpData;
    use crate::matrix::MatrixOpData;
    use crate::range::RangeOpData;

    fn matrix_scale(s: f64) -> Op {
        Op::new(OpData::Matrix(MatrixOpData::from_scale([s, s, s, 1.0])))
    }

    #[test]
    fn matrix_run_collapses_to_one() {
        let mut chain: OpChain =
            [matrix_scale(2.0), matrix_scale(4.0), matrix_scale(0.5)].into_iter().collect();
        chain.finalize(OptimizationFlags::DEFAULT).unwrap();
        assert_eq!(chain.len(), 1);
        match &chain.ops()[0].data {
            OpData::Matrix(m) => assert!((m.matrix.at(0, 0) - 4.0).abs() < 1e-12),
            other => panic!("expected matrix, got {}", other.kind()),
        }
    }

    #[test]
    fn cancelling_matrices_leave_empty_chain() {
        let mut chain: OpChain = [matrix_scale(2.0), matrix_scale(0.5)].into_iter().collect();
        chain.finalize(OptimizationFlags::DEFAULT).unwrap();
        assert!(chain.is_empty());
    }

    #[test]
    fn identity_cdl_becomes_unit_clamp_and_survives_stripping() {
        let mut chain = OpChain::new();
        chain.add(Op::new(OpData::Cdl(CdlOpData::default())));
        chain.finalize(OptimizationFlags::DEFAULT).unwrap();
        assert_eq!(chain.len(), 1);
        assert!(matches!(chain.ops()[0].data, OpData::Range(_)));
    }

    #[test]
    fn log_op_never_treated_as_identity() {
        // An identity-parameter log still transforms values, so is_identity
        // is false and the op must survive.
        let mut chain = OpChain::new();
        chain.add(Op::new(OpData::Log(LogOpData::with_base(
            10.0,
            Direction::Forward,
        ))));
        chain.finalize(OptimizationFlags::DEFAULT).unwrap();
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn log_inverse_pair_cancels_across_identity() {
        let fwd = LogOpData::with_base(2.0, Direction::Forward);
        let rev = fwd.inverse();
        let mut chain = OpChain::new();
        chain.add(Op::new(OpData::Log(fwd)));
        chain.add(Op::new(OpData::Log(rev)));
        chain.finalize(OptimizationFlags::DEFAULT).unwrap();
        assert!(chain.is_empty());
    }

    #[test]
    fn gamma_pair_multiplies_exponents() {
        let mut chain = OpChain::new();
        chain.add(Op::new(OpData::Gamma(GammaOpData::basic(
            GammaStyle::BasicFwd,
            [2.0, 2.0, 2.0, 1.0],
        ))));
        chain.add(Op::new(OpData::Gamma(GammaOpData::basic(
            GammaStyle::BasicFwd,
            [1.5, 1.5, 1.5, 1.0],
        ))));
        chain.finalize(OptimizationFlags::DEFAULT).unwrap();
        assert_eq!(chain.len(), 1);
        match &chain.ops()[0].data {
            OpData::Gamma(g) => assert!((g.params[0].gamma - 3.0).abs() < 1e-12),
            other => panic!("expected gamma, got {}", other.kind()),
        }
    }

    #[test]
    fn inverse_lut_becomes_range_plus_forward_lut() {
        let table: Vec<f32> = (0..17).map(|i| (i as f32 / 16.0).powf(2.2) * 2.0).collect();
        let lut = Lut1dOpData::from_channel(&table).inverse();
        let mut chain = OpChain::new();
        chain.add(Op::new(OpData::Lut1d(lut)));
        chain.finalize(OptimizationFlags::DEFAULT).unwrap();
        assert_eq!(chain.len(), 2);
        assert!(matches!(chain.ops()[0].data, OpData::Range(_)));
        match &chain.ops()[1].data {
            OpData::Lut1d(l) => assert_eq!(l.direction, Direction::Forward),
            other => panic!("expected 1D LUT, got {}", other.kind()),
        }
    }

    #[test]
    fn lossless_flags_keep_exact_inverse_lut() {
        let table: Vec<f32> = (0..33).map(|i| (i as f32 / 32.0).sqrt()).collect();
        let lut = Lut1dOpData::from_channel(&table).inverse();
        let mut chain = OpChain::new();
        chain.add(Op::new(OpData::Lut1d(lut)));
        chain.add(matrix_scale(2.0));
        chain.finalize(OptimizationFlags::LOSSLESS).unwrap();
        assert_eq!(chain.len(), 2);
        match &chain.ops()[0].data {
            OpData::Lut1d(l) => assert_eq!(l.direction, Direction::Inverse),
            other => panic!("expected 1D LUT, got {}", other.kind()),
        }
    }

    #[test]
    fn uncombinable_pair_left_in_place() {
        let mut chain = OpChain::new();
        chain.add(Op::new(OpData::Gamma(GammaOpData::basic(
            GammaStyle::MoncurveFwd,
            [2.4, 2.4, 2.4, 1.0],
        ))));
        chain.add(Op::new(OpData::Gamma(GammaOpData::basic(
            GammaStyle::MoncurveFwd,
            [2.4, 2.4, 2.4, 1.0],
        ))));
        // Moncurve pairs have no closed-form composite.
        chain.finalize(OptimizationFlags::DEFAULT).unwrap();
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn singular_matrix_inverse_aborts_finalize() {
        let mut singular = MatrixOpData::from_3x3([0.3; 9]);
        singular.direction = Direction::Inverse;
        let mut chain = OpChain::new();
        chain.add(Op::new(OpData::Matrix(singular)));
        chain.add(matrix_scale(2.0));
        assert!(chain.finalize(OptimizationFlags::DEFAULT).is_err());
    }

    #[test]
    fn none_flags_keep_everything() {
        let mut chain: OpChain = [matrix_scale(2.0), matrix_scale(0.5)].into_iter().collect();
        chain.finalize(OptimizationFlags::NONE).unwrap();
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn cache_id_is_order_sensitive() {
        let a: OpChain = [matrix_scale(2.0), matrix_scale(3.0)].into_iter().collect();
        let b: OpChain = [matrix_scale(3.0), matrix_scale(2.0)].into_iter().collect();
        assert_ne!(a.cache_id(), b.cache_id());
        assert_eq!(a.cache_id(), a.clone().cache_id());
    }

    #[test]
    fn range_clamp_pair_composes() {
        let wide = RangeOpData::clamp(0.0, 1.0);
        let tight = RangeOpData::clamp(0.2, 0.8);

        // Sequential application is the reference.
        let mut expected = [0.0_f32, 0.9, 0.5, 1.0];
        for r in [&wide, &tight] {
            crate::range::RangeKernel::new(r).apply_rgba(&mut expected);
        }

        let mut chain = OpChain::new();
        chain.add(Op::new(OpData::Range(wide)));
        chain.add(Op::new(OpData::Range(tight)));
        chain.finalize(OptimizationFlags::DEFAULT).unwrap();
        assert_eq!(chain.len(), 1);

        let mut pixels = [0.0_f32, 0.9, 0.5, 1.0];
        for op in chain.iter() {
            CpuKernel::new(op).unwrap().apply_rgba(&mut pixels);
        }
        assert_eq!(pixels, expected);
        assert!((pixels[0] - 0.2).abs() < 1e-6);
        assert!((pixels[1] - 0.8).abs() < 1e-6);
        assert!((pixels[2] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn disjoint_range_pair_is_left_in_place() {
        let mut chain = OpChain::new();
        chain.add(Op::new(OpData::Range(RangeOpData::clamp(0.0, 1.0))));
        chain.add(Op::new(OpData::Range(RangeOpData::clamp(2.0, 3.0))));
        chain.finalize(OptimizationFlags::DEFAULT).unwrap();
        assert_eq!(chain.len(), 2);
    }
}
