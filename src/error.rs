//! Engine-level error type.

use crate::{BufferError, LimitExceeded};

/// Errors surfaced to callers of the transform service.
///
/// Every [`apply`](crate::TransformService::apply) result must be treated as
/// fallible. Kernels themselves never fail on a valid
/// [`PixelBuffer`](crate::PixelBuffer); fallibility lives at construction
/// and lookup.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum TransformError {
    /// A transform was requested before any image was loaded.
    #[error("no image loaded")]
    NotLoaded,
    /// The transform identifier is not in the vocabulary.
    #[error("unknown transform `{0}`")]
    UnknownTransform(String),
    /// The transform was recognized but its parameter was not.
    #[error("invalid {transform} parameter: {reason}")]
    InvalidParameter {
        /// Canonical transform name.
        transform: &'static str,
        /// What was wrong.
        reason: &'static str,
    },
    /// A buffer failed its shape or bounds check.
    #[error(transparent)]
    Buffer(#[from] BufferError),
    /// A store with [`BufferLimits`](crate::BufferLimits) refused a buffer.
    #[error(transparent)]
    Limit(#[from] LimitExceeded),
}

impl TransformError {
    /// Whether this is a [`BufferError::ShapeMismatch`].
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(self, Self::Buffer(BufferError::ShapeMismatch { .. }))
    }

    /// Whether the caller can recover by loading an image or fixing the
    /// request, as opposed to a malformed buffer.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::NotLoaded | Self::UnknownTransform(_) | Self::InvalidParameter { .. }
        )
    }
}
