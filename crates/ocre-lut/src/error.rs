//! File-reader error types.

use thiserror::Error;

/// Result type for file-reader operations.
pub type LutResult<T> = Result<T, LutError>;

/// Errors raised while reading LUT and CDL files.
#[derive(Debug, Error)]
pub enum LutError {
    /// Parse failure. Names the file and the offending feature.
    #[error("{file}: {reason}")]
    Parse {
        /// File (or in-memory source label) being parsed.
        file: String,
        /// What was wrong with it.
        reason: String,
    },

    /// No reader is registered for the extension.
    #[error("no reader registered for extension '{0}'")]
    UnknownExtension(String),

    /// Parsed parameters failed op-data validation.
    #[error(transparent)]
    Op(#[from] ocre_ops::OpError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LutError {
    pub(crate) fn parse(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            reason: reason.into(),
        }
    }
}
