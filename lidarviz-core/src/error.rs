//! Error types for lidarviz

use thiserror::Error;

use crate::array::Layout;

/// Main error type for lidarviz operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expected array of size: {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Expected an array of dimension: {expected}, got {actual}")]
    DimensionMismatch { expected: String, actual: usize },

    #[error("Invalid shape: {0}")]
    ShapeMismatch(String),

    #[error("Expected a {expected} array")]
    LayoutMismatch { expected: Layout },

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Operation not supported by this object kind: {0}")]
    KindMismatch(String),

    #[error("Rendering loop interrupted")]
    Interrupted,

    #[error("Renderer backend error: {0}")]
    Backend(String),
}

impl Error {
    /// True for the cancellation outcome of the render loop, as opposed to a failure
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Interrupted)
    }
}

/// Result type alias for lidarviz operations
pub type Result<T> = std::result::Result<T, Error>;
