//! Error types for the layout-embedding library.

use thiserror::Error;

/// Errors that can occur while building or mutating a layout embedding.
///
/// Kinds follow the taxonomy fixed by the design: malformed input is always
/// [`LayoutEmbeddingError::InvalidInput`], a caller breaking an
/// [`crate::embedding::EmbeddingState`] invariant is
/// [`LayoutEmbeddingError::ConstraintViolation`], and a sector with no
/// feasible path is [`LayoutEmbeddingError::Infeasible`] — the search layers
/// treat the latter as a pruning signal, not a fatal error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutEmbeddingError {
    /// Malformed mesh/landmarks, non-manifold target mesh, or a layout
    /// vertex with no landmark.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// `embed_path` was called with a path that would break an
    /// [`crate::embedding::EmbeddingState`] invariant. The state is left
    /// unchanged.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// No feasible path exists for a layout edge under the current sector
    /// and block set.
    #[error("no feasible path for layout edge {0:?}")]
    Infeasible(crate::mesh::halfedge::HalfEdgeId),

    /// File read/write failure. Carries a rendered message rather than the
    /// source `io::Error` so the type stays `Clone + PartialEq`.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for LayoutEmbeddingError {
    fn from(e: std::io::Error) -> Self {
        LayoutEmbeddingError::Io(e.to_string())
    }
}

/// Result type alias for layout-embedding operations.
pub type Result<T> = std::result::Result<T, LayoutEmbeddingError>;
