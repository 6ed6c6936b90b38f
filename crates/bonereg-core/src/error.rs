//! Error types for image operations.

use thiserror::Error;

/// Error type shared by the image filters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImageError {
    /// Invalid input value or missing content.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Two images (or an image and a region) disagree in size.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Images that must share a voxel grid do not.
    #[error("Geometry mismatch: {0}")]
    GeometryMismatch(String),

    /// A requested region does not fit inside the image.
    #[error("Region out of bounds: {0}")]
    RegionOutOfBounds(String),

    /// Tensor data could not be read back.
    #[error("Data error: {0}")]
    Data(String),
}

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, ImageError>;

impl ImageError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a geometry mismatch error.
    pub fn geometry_mismatch(msg: impl Into<String>) -> Self {
        Self::GeometryMismatch(msg.into())
    }

    /// Create a region out of bounds error.
    pub fn region_out_of_bounds(msg: impl Into<String>) -> Self {
        Self::RegionOutOfBounds(msg.into())
    }

    /// Create a shape mismatch error from two sizes.
    pub fn shape_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ImageError::validation("mask is empty");
        assert_eq!(err.to_string(), "Validation error: mask is empty");
    }

    #[test]
    fn test_shape_mismatch() {
        let err = ImageError::shape_mismatch(&[10, 10, 10], &[5, 5, 5]);
        assert!(matches!(err, ImageError::ShapeMismatch { .. }));
        let msg = err.to_string();
        assert!(msg.contains("expected [10, 10, 10]"));
        assert!(msg.contains("got [5, 5, 5]"));
    }
}
