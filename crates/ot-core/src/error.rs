//! Error types for OrthoStat

use thiserror::Error;

/// OrthoStat error type
#[derive(Error, Debug)]
pub enum Error {
    /// Validation error (shape mismatch, bad argument)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Estimator queried before a successful fit
    #[error("Not fitted: {0}")]
    NotFitted(String),

    /// Computation error (numerical failure)
    #[error("Computation error: {0}")]
    Computation(String),

    /// Operation the wrapped model does not support
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl Error {
    /// Prefix a fold index and nuisance target onto the message, keeping
    /// the error kind intact. Used by the cross-fitting loop so a failing
    /// caller-supplied model can be traced to the fold that drove it.
    pub fn in_fold(self, fold: usize, target: &str) -> Self {
        let tag = |m: String| format!("fold {fold}, {target} nuisance: {m}");
        match self {
            Self::Validation(m) => Self::Validation(tag(m)),
            Self::NotFitted(m) => Self::NotFitted(tag(m)),
            Self::Computation(m) => Self::Computation(tag(m)),
            Self::Unsupported(m) => Self::Unsupported(tag(m)),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
