//! Interpolator trait for sampling values at continuous coordinates.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Samples a voxel tensor at continuous indices.
///
/// Indices outside the grid are clamped to the nearest border voxel; callers
/// that need a background value outside the image mask those samples
/// themselves.
pub trait Interpolator<B: Backend> {
    /// Interpolate `data` (`[Z, Y, X]` or `[Y, X]`) at `indices` (`[Batch, D]`,
    /// columns in x, y, z order). Returns `[Batch]` values.
    fn interpolate<const D: usize>(&self, data: &Tensor<B, D>, indices: Tensor<B, 2>) -> Tensor<B, 1>;
}

/// Interpolation contract used when resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum InterpolationMode {
    /// Trilinear, for intensities.
    Linear,
    /// Nearest neighbour, for label maps.
    NearestNeighbor,
}
