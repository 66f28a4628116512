//! Lowers a transform tree into an op chain.
//!
//! Reference: OCIO BuildOps (Transform -> OpRcPtrVec)
//!
//! Each leaf becomes one or more ops; groups concatenate children; file
//! transforms pull op-data out of the format registry. An inverse direction
//! anywhere in the tree reverses the affected span and inverts each op in it,
//! which can fail for ops with no inverse (singular matrices).

use ocre_math::Mat4d;
use ocre_ops::cdl::{CdlOpData, CdlStyle};
use ocre_ops::gamma::{GammaOpData, GammaStyle};
use ocre_ops::fixed_function::FixedFunctionOpData;
use ocre_ops::log::LogOpData;
use ocre_ops::lut3d;
use ocre_ops::matrix::MatrixOpData;
use ocre_ops::range::{RangeOpData, RangeStyle};
use ocre_ops::{Direction, Op, OpChain, OpData};
use tracing::{debug, trace};

use crate::error::{ProcError, ProcResult};
use crate::look::{self, LookRegistry};
use crate::transform::{
    CdlTransform, ExponentTransform, FileTransform, FixedFunctionTransform, Interpolation,
    LogTransform, LookTransform, MatrixTransform, NegativeStyle, RangeTransform, Transform,
};

/// Compiles transform trees against a set of registered looks.
#[derive(Debug, Default)]
pub struct TransformBuilder {
    looks: LookRegistry,
}

impl TransformBuilder {
    /// A builder with no looks registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder resolving look expressions against `looks`.
    pub fn with_looks(looks: LookRegistry) -> Self {
        Self { looks }
    }

    /// The look registry, for adding looks after construction.
    pub fn looks_mut(&mut self) -> &mut LookRegistry {
        &mut self.looks
    }

    /// Lowers `transform` into an unoptimized op chain.
    pub fn build(&self, transform: &Transform) -> ProcResult<OpChain> {
        let mut ops = Vec::new();
        self.collect(transform, Direction::Forward, &mut ops)?;
        debug!(ops = ops.len(), "built op chain from transform tree");
        Ok(ops.into_iter().collect())
    }

    fn collect(
        &self,
        transform: &Transform,
        outer: Direction,
        out: &mut Vec<Op>,
    ) -> ProcResult<()> {
        match transform {
            Transform::Group(g) => {
                let effective = compose(g.direction, outer);
                match effective {
                    Direction::Forward => {
                        for child in &g.children {
                            self.collect(child, effective, out)?;
                        }
                    }
                    Direction::Inverse => {
                        for child in g.children.iter().rev() {
                            self.collect(child, effective, out)?;
                        }
                    }
                }
                Ok(())
            }
            Transform::Look(l) => self.collect_look(l, outer, out),
            leaf => {
                let mut ops = leaf_ops(leaf)?;
                if outer == Direction::Inverse {
                    ops = invert_span(ops)?;
                }
                out.extend(ops);
                Ok(())
            }
        }
    }

    /// Resolves a look expression, trying fallback options in order.
    ///
    /// A file that fails to locate or load sinks only the current option;
    /// any other error aborts the build.
    fn collect_look(
        &self,
        l: &LookTransform,
        outer: Direction,
        out: &mut Vec<Op>,
    ) -> ProcResult<()> {
        let effective = compose(l.direction, outer);
        let options = look::parse_look_expression(&l.looks)?;
        if options.is_empty() {
            return Ok(());
        }

        let mut last_failure = String::new();
        for option in &options {
            match self.build_look_option(option, effective) {
                Ok(ops) => {
                    out.extend(ops);
                    return Ok(());
                }
                Err(err) if err.recoverable_in_look_fallback() => {
                    trace!(error = %err, "look option failed, trying next");
                    last_failure = err.to_string();
                }
                Err(err) => return Err(err),
            }
        }
        Err(ProcError::LookFailed {
            expr: l.looks.clone(),
            last: last_failure,
        })
    }

    fn build_look_option(
        &self,
        option: &[look::LookTerm],
        direction: Direction,
    ) -> ProcResult<Vec<Op>> {
        let mut ops = Vec::new();
        match direction {
            Direction::Forward => {
                for term in option {
                    let t = look::resolve_term(&self.looks, term)?;
                    self.collect(&t, Direction::Forward, &mut ops)?;
                }
            }
            Direction::Inverse => {
                for term in option.iter().rev() {
                    let t = look::resolve_term(&self.looks, term)?;
                    self.collect(&t, Direction::Inverse, &mut ops)?;
                }
            }
        }
        Ok(ops)
    }
}

fn compose(inner: Direction, outer: Direction) -> Direction {
    if outer == Direction::Inverse {
        inner.invert()
    } else {
        inner
    }
}

fn invert_span(ops: Vec<Op>) -> ProcResult<Vec<Op>> {
    ops.into_iter()
        .rev()
        .map(|op| op.inverse().map_err(ProcError::from))
        .collect()
}

fn leaf_ops(transform: &Transform) -> ProcResult<Vec<Op>> {
    let ops = match transform {
        Transform::Matrix(t) => vec![Op::new(OpData::Matrix(matrix_data(t)))],
        Transform::Exponent(t) => vec![Op::new(OpData::Gamma(exponent_data(t)))],
        Transform::Log(t) => vec![Op::new(OpData::Log(log_data(t)))],
        Transform::Range(t) => vec![Op::new(OpData::Range(range_data(t)))],
        Transform::Cdl(t) => vec![Op::new(OpData::Cdl(cdl_data(t)))],
        Transform::FixedFunction(t) => vec![Op::new(fixed_function_data(t)?)],
        Transform::File(t) => file_ops(t)?,
        Transform::Group(_) | Transform::Look(_) => {
            unreachable!("groups and looks are handled by collect")
        }
    };
    for op in &ops {
        op.validate()?;
    }
    Ok(ops)
}

fn matrix_data(t: &MatrixTransform) -> MatrixOpData {
    let mut data = MatrixOpData::from_matrix(Mat4d { m: t.matrix });
    data.offset = t.offset;
    data.direction = t.direction;
    data
}

fn exponent_data(t: &ExponentTransform) -> GammaOpData {
    let style = match (t.negative_style, t.direction) {
        (NegativeStyle::Clamp, Direction::Forward) => GammaStyle::BasicFwd,
        (NegativeStyle::Clamp, Direction::Inverse) => GammaStyle::BasicRev,
        (NegativeStyle::Mirror, Direction::Forward) => GammaStyle::BasicMirrorFwd,
        (NegativeStyle::Mirror, Direction::Inverse) => GammaStyle::BasicMirrorRev,
        (NegativeStyle::PassThru, Direction::Forward) => GammaStyle::BasicPassThruFwd,
        (NegativeStyle::PassThru, Direction::Inverse) => GammaStyle::BasicPassThruRev,
    };
    GammaOpData::basic(style, t.value)
}

fn log_data(t: &LogTransform) -> LogOpData {
    LogOpData::with_base(t.base, t.direction)
}

fn range_data(t: &RangeTransform) -> RangeOpData {
    RangeOpData {
        min_in: t.min_in,
        max_in: t.max_in,
        min_out: t.min_out,
        max_out: t.max_out,
        style: if t.clamp {
            RangeStyle::Clamp
        } else {
            RangeStyle::NoClamp
        },
        direction: t.direction,
        metadata: Default::default(),
    }
}

fn cdl_data(t: &CdlTransform) -> CdlOpData {
    let mut data = CdlOpData::new(t.slope, t.offset, t.power, t.saturation);
    data.style = match (t.clamp, t.direction) {
        (true, Direction::Forward) => CdlStyle::V12Fwd,
        (true, Direction::Inverse) => CdlStyle::V12Rev,
        (false, Direction::Forward) => CdlStyle::NoClampFwd,
        (false, Direction::Inverse) => CdlStyle::NoClampRev,
    };
    data
}

fn fixed_function_data(t: &FixedFunctionTransform) -> ProcResult<OpData> {
    let data = OpData::FixedFunction(FixedFunctionOpData::with_params(
        t.style,
        t.params.clone(),
    ));
    if t.direction == Direction::Inverse {
        Ok(data.inverse()?)
    } else {
        Ok(data)
    }
}

fn file_ops(t: &FileTransform) -> ProcResult<Vec<Op>> {
    let extension = t
        .src
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let data = if t.cccid.is_some() && matches!(extension.as_str(), "cc" | "ccc" | "cdl") {
        ocre_lut::read_cdl_collection(&t.src, t.cccid.as_deref())?
    } else {
        ocre_lut::registry().read_file(&t.src)?
    };

    let mut ops: Vec<Op> = data
        .into_iter()
        .map(|mut d| {
            if let OpData::Lut3d(lut) = &mut d {
                lut.interpolation = match t.interpolation {
                    Interpolation::Linear => lut3d::Interpolation::Trilinear,
                    Interpolation::Tetrahedral | Interpolation::Best => {
                        lut3d::Interpolation::Tetrahedral
                    }
                };
            }
            Op::new(d)
        })
        .collect();
    if t.direction == Direction::Inverse {
        ops = invert_span(ops)?;
    }
    Ok(ops)
}
