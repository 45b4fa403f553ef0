//! Error types for the warp engine

use thiserror::Error;

/// Errors that can occur while estimating or applying a quad warp
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WarpError {
    /// Elimination found no pivot above the tolerance in some column
    #[error("singular linear system: no usable pivot in column {column}")]
    SingularSystem { column: usize },

    /// The four correspondences do not determine a homography
    #[error("degenerate quadrilateral: points are collinear or coincident")]
    DegenerateQuad,

    /// A triangle with (near-)zero area was handed to the affine mapper
    #[error("degenerate triangle: vertices are collinear or coincident")]
    DegenerateTriangle,

    /// An API that needs exactly four points got some other number
    #[error("expected {expected} points, got {actual}")]
    InvalidPointCount { expected: usize, actual: usize },
}

/// Result type for warp operations
pub type WarpResult<T> = Result<T, WarpError>;
