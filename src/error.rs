//! Error types for tensor construction and operations.
//!
//! Every fallible entry point returns [`TensorError`]. All variants are
//! local, synchronous logic errors raised at the point of violation;
//! validation runs before mutation, so a failed call leaves the receiver
//! unchanged.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, TensorError>;

/// Errors raised by tensor construction and operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TensorError {
    /// Nested values whose shape disagrees with the target shape, either
    /// between siblings of a literal or between a value tree and the view it
    /// is written into. `path` is the 1-based position of the offending
    /// entry (empty for a whole-tree mismatch).
    #[error("shape mismatch at entry {path:?}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        path: Vec<usize>,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    /// A range or file window that falls outside its source: degenerate
    /// range parameters, an unreadable file, or a byte window past the end
    /// of the file.
    #[error("range out of bounds: {reason}")]
    RangeOutOfBounds { reason: String },

    /// A dimension or index argument outside the view's rank or extents,
    /// or a reduction over data that has no elements to compare.
    #[error("invalid dimension: {reason}")]
    InvalidDimension { reason: String },

    /// Component or accumulate operands whose element counts or element
    /// types disagree, or a dynamic-surface value that is not representable
    /// in the target element type.
    #[error("length or type mismatch: {reason}")]
    LengthOrTypeMismatch { reason: String },

    /// Clamp bounds where the minimum exceeds the maximum.
    #[error("invalid clamp bounds: minimum {min} must not exceed maximum {max}")]
    InvalidClampBounds { min: String, max: String },

    /// Matrix product operands that are not rank-2 or whose inner
    /// dimensions differ.
    #[error("dimension mismatch: cannot multiply {left:?} by {right:?}")]
    DimensionMismatch {
        left: Vec<usize>,
        right: Vec<usize>,
    },

    /// Access through a view whose borrowed storage was released by its
    /// external owner.
    #[error("invalid storage: the backing buffer has been released")]
    InvalidStorage,
}

impl TensorError {
    pub(crate) fn bad_dimension(reason: impl Into<String>) -> Self {
        TensorError::InvalidDimension {
            reason: reason.into(),
        }
    }

    pub(crate) fn mismatch(reason: impl Into<String>) -> Self {
        TensorError::LengthOrTypeMismatch {
            reason: reason.into(),
        }
    }

    pub(crate) fn out_of_bounds(reason: impl Into<String>) -> Self {
        TensorError::RangeOutOfBounds {
            reason: reason.into(),
        }
    }
}
