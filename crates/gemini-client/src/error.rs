//! Generation failure categories.

use thiserror::Error;

/// Why a generation (or one of its fragments) failed.
///
/// Callers match on the variant to pick a recovery: a rejected prompt committed nothing, a halted
/// turn must be rewound, an unsupported shape ends the stream, a transport failure is fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The prompt was blocked before any output was produced.
    #[error("prompt rejected: {0}")]
    Rejected(String),

    /// The model stopped mid-generation for a non-terminal reason (safety, recitation, ...).
    #[error("generation halted: {0}")]
    Halted(String),

    /// The response carried something other than text (function call, missing candidate, ...).
    #[error("unsupported response shape: {0}")]
    UnsupportedShape(String),

    /// The backend could not be reached or the connection broke mid-stream.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("{0}")]
    Other(String),
}

impl GenerationError {
    pub fn is_transport(&self) -> bool {
        matches!(self, GenerationError::Transport(_))
    }
}
