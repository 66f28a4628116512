//! Op wrapper: a uniform surface over every op-data kind.
//!
//! Reference: OCIO Op.cpp, OpData.cpp
//!
//! The chain optimizer only talks to [`Op`]: validation, identity detection
//! and replacement, inversion, pairwise combination, and cache ids all
//! dispatch here. Combination rules that would need a kind the model cannot
//! represent simply report "cannot combine" and the pair stays.

use crate::cdl::CdlOpData;
use crate::error::{OpError, OpResult};
use crate::fixed_function::FixedFunctionOpData;
use crate::gamma::GammaOpData;
use crate::grading_primary::GradingPrimaryOpData;
use crate::log::LogOpData;
use crate::lut1d::{HueAdjust, Lut1dOpData};
use crate::lut3d::Lut3dOpData;
use crate::matrix::MatrixOpData;
use crate::range::RangeOpData;

/// Direction an op is applied in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Inverse,
}

impl Direction {
    /// The opposite direction.
    pub fn invert(self) -> Self {
        match self {
            Self::Forward => Self::Inverse,
            Self::Inverse => Self::Forward,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Forward => "forward",
            Self::Inverse => "inverse",
        })
    }
}

/// Parameter data for one op.
#[derive(Debug, Clone)]
pub enum OpData {
    Matrix(MatrixOpData),
    Range(RangeOpData),
    Gamma(GammaOpData),
    Log(LogOpData),
    Cdl(CdlOpData),
    FixedFunction(FixedFunctionOpData),
    GradingPrimary(GradingPrimaryOpData),
    Lut1d(Lut1dOpData),
    Lut3d(Lut3dOpData),
}

impl OpData {
    /// Short kind tag used in logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            OpData::Matrix(_) => "Matrix",
            OpData::Range(_) => "Range",
            OpData::Gamma(_) => "Gamma",
            OpData::Log(_) => "Log",
            OpData::Cdl(_) => "CDL",
            OpData::FixedFunction(_) => "FixedFunction",
            OpData::GradingPrimary(_) => "GradingPrimary",
            OpData::Lut1d(_) => "Lut1D",
            OpData::Lut3d(_) => "Lut3D",
        }
    }

    pub fn validate(&self) -> OpResult<()> {
        match self {
            OpData::Matrix(d) => d.validate(),
            OpData::Range(d) => d.validate(),
            OpData::Gamma(d) => d.validate(),
            OpData::Log(d) => d.validate(),
            OpData::Cdl(d) => d.validate(),
            OpData::FixedFunction(d) => d.validate(),
            OpData::GradingPrimary(d) => d.validate(),
            OpData::Lut1d(d) => d.validate(),
            OpData::Lut3d(d) => d.validate(),
        }
    }

    pub fn is_identity(&self) -> bool {
        match self {
            OpData::Matrix(d) => d.is_identity(),
            OpData::Range(d) => d.is_identity(),
            OpData::Gamma(d) => d.is_identity(),
            OpData::Log(d) => d.is_identity(),
            OpData::Cdl(d) => d.is_identity(),
            OpData::FixedFunction(d) => d.is_identity(),
            OpData::GradingPrimary(d) => d.is_identity(),
            OpData::Lut1d(d) => d.is_identity(),
            OpData::Lut3d(d) => d.is_identity(),
        }
    }

    /// The op undoing this one. Fails for a singular matrix.
    pub fn inverse(&self) -> OpResult<OpData> {
        Ok(match self {
            OpData::Matrix(d) => OpData::Matrix(d.inverse()?),
            OpData::Range(d) => OpData::Range(d.inverse()),
            OpData::Gamma(d) => OpData::Gamma(d.inverse()),
            OpData::Log(d) => OpData::Log(d.inverse()),
            OpData::Cdl(d) => OpData::Cdl(d.inverse()),
            OpData::FixedFunction(d) => OpData::FixedFunction(d.inverse()),
            OpData::GradingPrimary(d) => OpData::GradingPrimary(d.inverse()),
            OpData::Lut1d(d) => OpData::Lut1d(d.inverse()),
            OpData::Lut3d(d) => OpData::Lut3d(d.inverse()),
        })
    }

    /// True when output channels mix input channels.
    pub fn has_channel_crosstalk(&self) -> bool {
        match self {
            OpData::Matrix(d) => !d.is_diagonal(),
            OpData::Range(_) | OpData::Gamma(_) | OpData::Log(_) => false,
            OpData::Cdl(d) => d.has_channel_crosstalk(),
            OpData::FixedFunction(_) => true,
            OpData::GradingPrimary(_) => true,
            OpData::Lut1d(d) => d.hue_adjust != HueAdjust::None,
            OpData::Lut3d(_) => true,
        }
    }

    pub fn cache_id(&self) -> String {
        match self {
            OpData::Matrix(d) => d.cache_id(),
            OpData::Range(d) => d.cache_id(),
            OpData::Gamma(d) => d.cache_id(),
            OpData::Log(d) => d.cache_id(),
            OpData::Cdl(d) => d.cache_id(),
            OpData::FixedFunction(d) => d.cache_id(),
            OpData::GradingPrimary(d) => d.cache_id(),
            OpData::Lut1d(d) => d.cache_id(),
            OpData::Lut3d(d) => d.cache_id(),
        }
    }
}

/// One op in a chain.
#[derive(Debug, Clone)]
pub struct Op {
    pub data: OpData,
}

impl Op {
    pub fn new(data: OpData) -> Self {
        Self { data }
    }

    pub fn validate(&self) -> OpResult<()> {
        self.data.validate()
    }

    pub fn is_identity(&self) -> bool {
        self.data.is_identity()
    }

    pub fn inverse(&self) -> OpResult<Self> {
        Ok(Self::new(self.data.inverse()?))
    }

    pub fn cache_id(&self) -> String {
        self.data.cache_id()
    }

    /// What an identity op becomes during optimization.
    ///
    /// `None` drops the op. Ops whose identity form still clamps are kept as
    /// the Range preserving that clamp: an identity BASIC gamma clamps below
    /// zero, an identity V1.2 CDL clamps to [0, 1].
    pub fn identity_replacement(&self) -> Option<OpData> {
        match &self.data {
            OpData::Gamma(d) if d.clamps() => Some(OpData::Range(RangeOpData::clamp_min(0.0))),
            OpData::Cdl(d) if d.style.clamps() => Some(OpData::Range(RangeOpData::clamp(0.0, 1.0))),
            _ => None,
        }
    }

    /// True when [`Op::combine_with`] has a rule for this pair.
    pub fn can_combine_with(&self, next: &Op) -> bool {
        match (&self.data, &next.data) {
            (OpData::Matrix(_), OpData::Matrix(_)) => true,
            (OpData::Range(a), OpData::Range(b)) => {
                a.resolved().compose(&b.resolved()).validate().is_ok()
            }
            (OpData::Range(a), OpData::Matrix(_)) => a.resolved().as_matrix().is_some(),
            (OpData::Matrix(_), OpData::Range(b)) => b.resolved().as_matrix().is_some(),
            (OpData::Lut1d(a), OpData::Lut1d(b)) => {
                luts_cancel(a, b)
                    || (a.direction == Direction::Forward
                        && b.direction == Direction::Forward
                        && a.hue_adjust == HueAdjust::None
                        && b.hue_adjust == HueAdjust::None)
            }
            (OpData::Log(a), OpData::Log(b)) => a.is_inverse_of(b),
            (OpData::Gamma(a), OpData::Gamma(b)) => a.compose_basic(b).is_some(),
            (OpData::Cdl(a), OpData::Cdl(b)) => {
                a.is_inverse_of(b) || a.compose_affine(b).is_some()
            }
            (OpData::FixedFunction(a), OpData::FixedFunction(b)) => a.is_inverse_of(b),
            _ => false,
        }
    }

    /// Replaces `self` then `next` with an equivalent shorter sequence.
    /// An empty result means the pair cancels outright.
    pub fn combine_with(&self, next: &Op) -> OpResult<Vec<Op>> {
        let combined: Vec<OpData> = match (&self.data, &next.data) {
            (OpData::Matrix(a), OpData::Matrix(b)) => {
                vec![OpData::Matrix(a.resolved()?.compose(&b.resolved()?))]
            }
            (OpData::Range(a), OpData::Range(b)) => {
                let c = a.resolved().compose(&b.resolved());
                // Disjoint in-domains compose to an unrepresentable constant
                // map; leave the pair in place.
                c.validate().map_err(|_| not_combinable())?;
                vec![OpData::Range(c)]
            }
            (OpData::Range(a), OpData::Matrix(b)) => {
                let m = a.resolved().as_matrix().ok_or_else(not_combinable)?;
                vec![OpData::Matrix(m.compose(&b.resolved()?))]
            }
            (OpData::Matrix(a), OpData::Range(b)) => {
                let m = b.resolved().as_matrix().ok_or_else(not_combinable)?;
                vec![OpData::Matrix(a.resolved()?.compose(&m))]
            }
            (OpData::Lut1d(a), OpData::Lut1d(b)) => {
                if luts_cancel(a, b) {
                    vec![]
                } else {
                    vec![OpData::Lut1d(a.compose(b)?)]
                }
            }
            (OpData::Log(a), OpData::Log(b)) if a.is_inverse_of(b) => vec![],
            (OpData::Gamma(a), OpData::Gamma(b)) => {
                let c = a.compose_basic(b).ok_or_else(not_combinable)?;
                if c.is_identity() {
                    // A unit-exponent BASIC gamma still clamps below zero.
                    vec![OpData::Range(RangeOpData::clamp_min(0.0))]
                } else {
                    vec![OpData::Gamma(c)]
                }
            }
            (OpData::Cdl(a), OpData::Cdl(b)) => {
                if a.is_inverse_of(b) {
                    vec![]
                } else {
                    let c = a.compose_affine(b).ok_or_else(not_combinable)?;
                    vec![OpData::Cdl(c)]
                }
            }
            (OpData::FixedFunction(a), OpData::FixedFunction(b)) if a.is_inverse_of(b) => {
                vec![]
            }
            _ => return Err(not_combinable()),
        };
        Ok(combined.into_iter().map(Op::new).collect())
    }
}

fn not_combinable() -> OpError {
    OpError::structural("Op", "ops cannot be combined")
}

/// Same table applied in opposite directions collapses to identity.
fn luts_cancel(a: &Lut1dOpData, b: &Lut1dOpData) -> bool {
    a.direction == b.direction.invert()
        && a.table == b.table
        && a.half_domain == b.half_domain
        && a.hue_adjust == HueAdjust::None
        && b.hue_adjust == HueAdjust::None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamma::GammaStyle;
    use crate::range::RangeStyle;

    #[test]
    fn matrix_pair_combines() {
        let a = Op::new(OpData::Matrix(MatrixOpData::from_scale([2.0, 2.0, 2.0, 1.0])));
        let b = Op::new(OpData::Matrix(MatrixOpData::from_scale([0.5, 0.5, 0.5, 1.0])));
        assert!(a.can_combine_with(&b));
        let combined = a.combine_with(&b).unwrap();
        assert_eq!(combined.len(), 1);
        assert!(combined[0].is_identity());
    }

    #[test]
    fn log_inverse_pair_cancels() {
        let fwd = LogOpData::with_base(10.0, Direction::Forward);
        let rev = fwd.inverse();
        let a = Op::new(OpData::Log(fwd));
        let b = Op::new(OpData::Log(rev));
        assert!(a.can_combine_with(&b));
        assert!(a.combine_with(&b).unwrap().is_empty());
    }

    #[test]
    fn forward_logs_do_not_combine() {
        let a = Op::new(OpData::Log(LogOpData::with_base(10.0, Direction::Forward)));
        let b = Op::new(OpData::Log(LogOpData::with_base(10.0, Direction::Forward)));
        assert!(!a.can_combine_with(&b));
    }

    #[test]
    fn disjoint_ranges_do_not_combine() {
        let a = Op::new(OpData::Range(RangeOpData::clamp(0.0, 1.0)));
        let b = Op::new(OpData::Range(RangeOpData::clamp(2.0, 3.0)));
        assert!(!a.can_combine_with(&b));
        assert!(a.combine_with(&b).is_err());
    }

    #[test]
    fn noclamp_range_merges_with_matrix() {
        let mut range = RangeOpData::new(0.0, 1.0, 0.0, 2.0);
        range.style = RangeStyle::NoClamp;
        let a = Op::new(OpData::Range(range));
        let b = Op::new(OpData::Matrix(MatrixOpData::from_scale([3.0, 3.0, 3.0, 1.0])));
        assert!(a.can_combine_with(&b));
        let combined = a.combine_with(&b).unwrap();
        match &combined[0].data {
            OpData::Matrix(m) => assert!((m.matrix.at(0, 0) - 6.0).abs() < 1e-12),
            other => panic!("expected matrix, got {}", other.kind()),
        }
    }

    #[test]
    fn clamping_range_does_not_merge_with_matrix() {
        let a = Op::new(OpData::Range(RangeOpData::clamp(0.0, 1.0)));
        let b = Op::new(OpData::Matrix(MatrixOpData::identity()));
        assert!(!a.can_combine_with(&b));
    }

    #[test]
    fn identity_gamma_replacement_keeps_clamp() {
        let id = Op::new(OpData::Gamma(GammaOpData::basic(GammaStyle::BasicFwd, [1.0; 4])));
        assert!(id.is_identity());
        match id.identity_replacement() {
            Some(OpData::Range(r)) => {
                assert_eq!(r.min_out, Some(0.0));
                assert_eq!(r.max_out, None);
            }
            other => panic!("expected range replacement, got {other:?}"),
        }

        // Mirror styles do not clamp; the identity simply drops.
        let id = Op::new(OpData::Gamma(GammaOpData::basic(
            GammaStyle::BasicMirrorFwd,
            [1.0; 4],
        )));
        assert!(id.identity_replacement().is_none());
    }

    #[test]
    fn identity_cdl_replacement_is_unit_clamp() {
        let id = Op::new(OpData::Cdl(CdlOpData::default()));
        assert!(id.is_identity());
        match id.identity_replacement() {
            Some(OpData::Range(r)) => {
                assert_eq!(r.min_out, Some(0.0));
                assert_eq!(r.max_out, Some(1.0));
            }
            other => panic!("expected range replacement, got {other:?}"),
        }
    }

    #[test]
    fn lut_inverse_pair_cancels() {
        let lut = Lut1dOpData::identity(33);
        let a = Op::new(OpData::Lut1d(lut.clone()));
        let b = Op::new(OpData::Lut1d(lut.inverse()));
        assert!(a.can_combine_with(&b));
        assert!(a.combine_with(&b).unwrap().is_empty());
    }

    #[test]
    fn crosstalk_classification() {
        assert!(!Op::new(OpData::Range(RangeOpData::clamp(0.0, 1.0)))
            .data
            .has_channel_crosstalk());
        assert!(Op::new(OpData::Lut3d(Lut3dOpData::identity(2)))
            .data
            .has_channel_crosstalk());
        let mut cdl = CdlOpData::default();
        assert!(!OpData::Cdl(cdl.clone()).has_channel_crosstalk());
        cdl.saturation = 0.8;
        assert!(OpData::Cdl(cdl).has_channel_crosstalk());
    }
}
