use std::path::PathBuf;
use thiserror::Error;

use crate::hierarchy::HierarchyError;
use crate::review::ReviewError;

/// Result type for joosc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the joosc backend
///
/// `Hierarchy` and `Review` mean the input program is invalid. `Internal`
/// means an upstream stage handed over something this backend cannot make
/// sense of, i.e. a compiler defect rather than a user error.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot write output file {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Type hierarchy error: {0}")]
    Hierarchy(#[from] HierarchyError),

    #[error("Semantic error: {0}")]
    Review(#[from] ReviewError),

    #[error("Unsupported feature: {feature}")]
    UnsupportedFeature { feature: String },

    #[error("Internal compiler error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create an internal (compiler defect) error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Create an unsupported-feature error
    pub fn unsupported(feature: impl Into<String>) -> Self {
        Self::UnsupportedFeature { feature: feature.into() }
    }

    /// Whether the failure points at the compiler rather than the program
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Whether the failure is a rejection of an invalid input program
    pub fn is_semantic(&self) -> bool {
        matches!(self, Self::Hierarchy(_) | Self::Review(_))
    }
}
