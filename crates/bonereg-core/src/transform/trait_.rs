//! Transform trait for spatial coordinate transformations.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Maps a batch of physical points to another physical space.
///
/// # Type Parameters
/// * `B` - The Burn backend
/// * `D` - The spatial dimensionality
pub trait Transform<B: Backend, const D: usize> {
    /// Apply the transform to a `[Batch, D]` tensor of points.
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2>;
}
