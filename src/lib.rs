//! xform3: 3D rigid-transform algebra.
//!
//! Three interchangeable representations of spatial rotation and
//! translation - a row-major 4x4 homogeneous matrix, a unit quaternion,
//! and an ordered Euler-angle triple - with lossless (to floating-point
//! precision) conversion between them, plus the composition operations
//! (multiply, invert, decompose) needed to build transform chains.
//!
//! Conventions, fixed crate-wide and pinned by tests:
//! - points are row vectors: `v' = v * M`, translation in row 4, so
//!   "apply A, then B" composes as `A * B`;
//! - `Quaternion::concatenated(a, b)` also reads in application order
//!   and equals `b.multiplied(&a)`;
//! - Euler orders name their application sequence (`XYZ` = X first),
//!   and Euler values convert only via the matrix form.

pub mod euler;
pub mod mat4;
pub mod precision;
pub mod quat;
pub mod vec3;

// Re-exports for convenience
pub use euler::{EulerAngle, EulerOrder};
pub use mat4::{Decomposition, Matrix4x4};
pub use quat::Quaternion;
pub use vec3::Vector3;

/// Default tolerance for transform comparisons
pub const TOLERANCE: f64 = 1e-6;

/// Result type for transform operations
pub type Result<T> = std::result::Result<T, XformError>;

/// Everything that can go wrong inside the kernel. All failures are
/// detected synchronously; nothing is retried and nothing is silently
/// recovered.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum XformError {
    /// Malformed construction parameter: non-positive or inverted view
    /// planes, out-of-range field of view, zero-length rotation axis,
    /// degenerate look-at basis.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Inversion of a matrix whose determinant vanishes.
    #[error("matrix is not invertible (determinant {determinant})")]
    NotInvertible {
        /// The offending determinant value.
        determinant: f64,
    },

    /// Decomposition of a transform with a numerically zero axis scale;
    /// the rotation cannot be recovered from a singular linear block.
    #[error("degenerate transform: {0}")]
    Degenerate(String),
}
