//! Index map: input-value to LUT-position pairs from CSP-style preluts.
//!
//! Reference: OCIO fileformats/FileFormatCSP.cpp (prelut handling)
//!
//! A two-entry map is an affine remap of the LUT domain and converts to a
//! Range op that pre-composes with the LUT it accompanies. Longer maps are
//! piecewise and are resampled by the file reader before reaching the op
//! chain, so only the two-entry form converts here.

use crate::error::{OpError, OpResult};
use crate::range::RangeOpData;

/// Paired input values and LUT positions; both strictly increasing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexMap {
    /// Input domain samples.
    pub inputs: Vec<f64>,
    /// Matching positions in the LUT domain, usually [0, 1].
    pub outputs: Vec<f64>,
}

impl IndexMap {
    pub fn new(inputs: Vec<f64>, outputs: Vec<f64>) -> Self {
        Self { inputs, outputs }
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Checks pairing and strict monotonicity of both sequences.
    pub fn validate(&self) -> OpResult<()> {
        if self.inputs.len() != self.outputs.len() {
            return Err(OpError::structural(
                "IndexMap",
                format!(
                    "input count {} does not match output count {}",
                    self.inputs.len(),
                    self.outputs.len()
                ),
            ));
        }
        if self.inputs.len() < 2 {
            return Err(OpError::structural(
                "IndexMap",
                format!("at least 2 entries required, got {}", self.inputs.len()),
            ));
        }
        for w in self.inputs.windows(2) {
            if w[1] <= w[0] {
                return Err(OpError::structural(
                    "IndexMap",
                    format!("input values must be strictly increasing ({} then {})", w[0], w[1]),
                ));
            }
        }
        for w in self.outputs.windows(2) {
            if w[1] <= w[0] {
                return Err(OpError::structural(
                    "IndexMap",
                    format!(
                        "output positions must be strictly increasing ({} then {})",
                        w[0], w[1]
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Converts a two-entry map into the equivalent clamping Range.
    pub fn as_range(&self) -> OpResult<RangeOpData> {
        self.validate()?;
        if self.inputs.len() != 2 {
            return Err(OpError::structural(
                "IndexMap",
                format!(
                    "only a 2-entry index map converts to a range, got {} entries",
                    self.inputs.len()
                ),
            ));
        }
        Ok(RangeOpData::new(
            self.inputs[0],
            self.inputs[1],
            self.outputs[0],
            self.outputs[1],
        ))
    }
}
