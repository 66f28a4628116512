//! Error types for transform building and processor application.

use thiserror::Error;

/// Result type alias using [`ProcError`].
pub type ProcResult<T> = std::result::Result<T, ProcError>;

/// Errors raised while compiling a transform tree or applying a processor.
#[derive(Debug, Error)]
pub enum ProcError {
    /// An op rejected its parameters or could not be combined/inverted.
    #[error(transparent)]
    Op(#[from] ocre_ops::OpError),

    /// A referenced LUT or CDL file could not be read.
    #[error(transparent)]
    Lut(#[from] ocre_lut::LutError),

    /// The image descriptor is unusable.
    #[error(transparent)]
    Core(#[from] ocre_core::CoreError),

    /// A look expression does not match the grammar.
    #[error("look expression '{expr}': {reason}")]
    LookParse {
        /// The offending expression.
        expr: String,
        /// What failed to parse.
        reason: String,
    },

    /// Every option of a look expression failed to resolve.
    #[error("look expression '{expr}': no option could be resolved (last: {last})")]
    LookFailed {
        /// The expression whose options were exhausted.
        expr: String,
        /// The failure that sank the last option.
        last: String,
    },

    /// The image layout is not one the CPU path supports.
    #[error("unsupported image layout: {reason}")]
    UnsupportedLayout {
        /// What the descriptor declares that the path cannot handle.
        reason: String,
    },
}

impl ProcError {
    /// True when a look-option fallback may swallow this error and try the
    /// next option. Only missing or unreadable files qualify.
    pub(crate) fn recoverable_in_look_fallback(&self) -> bool {
        matches!(self, ProcError::Lut(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_errors_are_recoverable_in_fallback() {
        let io = ProcError::Lut(ocre_lut::LutError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such file",
        )));
        assert!(io.recoverable_in_look_fallback());

        let op = ProcError::Op(ocre_ops::OpError::structural("Matrix", "bad"));
        assert!(!op.recoverable_in_look_fallback());
    }

    #[test]
    fn look_errors_name_the_expression() {
        let err = ProcError::LookFailed {
            expr: "+shot_a | +neutral".into(),
            last: "missing look".into(),
        };
        assert!(err.to_string().contains("+shot_a | +neutral"));
    }
}
