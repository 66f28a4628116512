//! Error types for op validation, composition, and rendering.

use thiserror::Error;

/// Error type for op construction, validation and chain optimization.
#[derive(Error, Debug)]
pub enum OpError {
    /// A numeric parameter is outside its documented range.
    ///
    /// The message names the op kind, the parameter, the offending value,
    /// and both bounds.
    #[error("{op}: parameter '{param}' is {value}, valid range is [{min}, {max}]")]
    ParamOutOfRange {
        /// Op kind (e.g. "Gamma").
        op: &'static str,
        /// Parameter name (e.g. "gamma").
        param: &'static str,
        /// The rejected value.
        value: f64,
        /// Lower bound (inclusive).
        min: f64,
        /// Upper bound (inclusive).
        max: f64,
    },

    /// The op's parameters are structurally inconsistent.
    #[error("{op}: {reason}")]
    Structural {
        /// Op kind.
        op: &'static str,
        /// What is inconsistent.
        reason: String,
    },

    /// An inverse was requested but does not exist.
    #[error("{op}: {reason}")]
    Uninvertible {
        /// Op kind.
        op: &'static str,
        /// Why the op cannot be inverted.
        reason: String,
    },

    /// An enum-valued string did not match any known variant.
    #[error("unknown {what}: '{value}'")]
    UnknownEnum {
        /// What kind of enum was being parsed.
        what: &'static str,
        /// The unrecognized token.
        value: String,
    },
}

impl OpError {
    /// Shorthand for a structural error.
    pub fn structural(op: &'static str, reason: impl Into<String>) -> Self {
        Self::Structural {
            op,
            reason: reason.into(),
        }
    }

    /// Shorthand for an uninvertible error.
    pub fn uninvertible(op: &'static str, reason: impl Into<String>) -> Self {
        Self::Uninvertible {
            op,
            reason: reason.into(),
        }
    }
}

/// Result type for op operations.
pub type OpResult<T> = Result<T, OpError>;
