//! Resample image filter.
//!
//! Each output voxel is mapped to physical space, pushed through the
//! transform into the input's physical space, and sampled there. The
//! transform therefore maps output space to input space; for a registration
//! result that is the fixed-to-moving transform.

use std::marker::PhantomData;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use crate::error::{ImageError, Result};
use crate::image::{generate_grid_range, Image, ImageMetadata};
use crate::interpolation::Interpolator;
use crate::transform::Transform;

/// Voxels processed per batch.
const CHUNK_SIZE: usize = 32768;

/// Resample image filter.
///
/// Output voxels that map outside the input image (continuous index outside
/// `[-0.5, size - 0.5)` on any axis) receive the default pixel value. The
/// output keeps the input's pixel type; integer types are clamped and
/// truncated after interpolation.
///
/// # Type Parameters
/// * `B` - The Burn backend
/// * `T` - The transform type
/// * `I` - The interpolator type
pub struct ResampleImageFilter<B, T, I>
where
    B: Backend,
    T: Transform<B, 3>,
    I: Interpolator<B>,
{
    output: ImageMetadata<3>,
    transform: T,
    interpolator: I,
    default_pixel_value: f64,
    _phantom: PhantomData<B>,
}

impl<B, T, I> ResampleImageFilter<B, T, I>
where
    B: Backend,
    T: Transform<B, 3>,
    I: Interpolator<B>,
{
    /// Resample onto an explicit output grid.
    pub fn new(output: ImageMetadata<3>, transform: T, interpolator: I) -> Self {
        Self {
            output,
            transform,
            interpolator,
            default_pixel_value: 0.0,
            _phantom: PhantomData,
        }
    }

    /// Resample onto the grid of `reference`.
    pub fn new_from_reference(reference: &Image<B, 3>, transform: T, interpolator: I) -> Self {
        Self::new(reference.metadata(), transform, interpolator)
    }

    /// Value used outside the input image.
    pub fn with_default_pixel_value(mut self, value: f64) -> Self {
        self.default_pixel_value = value;
        self
    }

    pub fn apply(&self, input: &Image<B, 3>) -> Result<Image<B, 3>> {
        let device = input.device();
        let shape = self.output.shape();
        let total = self.output.num_voxels();
        let input_meta = input.metadata();
        let input_size = input.size();
        let mut values = Vec::with_capacity(total);

        let mut start = 0;
        while start < total {
            let end = (start + CHUNK_SIZE).min(total);
            let indices = generate_grid_range::<B>(shape, start, end, &device);
            let points = self.output.index_to_world_tensor(indices);
            let input_points = self.transform.transform_points(points);
            let input_indices = input_meta.world_to_index_tensor(input_points);

            let inside = inside_domain(input_indices.clone(), input_size);
            let sampled = self.interpolator.interpolate(input.data(), input_indices);
            let chunk = sampled * inside.clone() + (inside.neg() + 1.0) * self.default_pixel_value;

            values.extend(
                chunk
                    .into_data()
                    .convert::<f32>()
                    .to_vec::<f32>()
                    .map_err(|e| ImageError::Data(format!("{:?}", e)))?,
            );
            start = end;
        }

        let pixel_type = input.pixel_type();
        let values = values.into_iter().map(|v| pixel_type.cast(v)).collect();
        Image::from_voxels(values, &self.output, pixel_type, &device)
    }
}

/// Mask that is 1.0 where a continuous index lies inside `[-0.5, size - 0.5)` on every axis.
pub fn inside_domain<B: Backend>(indices: Tensor<B, 2>, size: [usize; 3]) -> Tensor<B, 1> {
    let mut inside: Option<Tensor<B, 1>> = None;
    for (axis, &len) in size.iter().enumerate() {
        let column = indices.clone().narrow(1, axis, 1).squeeze::<1>(1);
        let ok = column.clone().greater_equal_elem(-0.5).float()
            * column.lower_elem(len as f64 - 0.5).float();
        inside = Some(match inside {
            Some(acc) => acc * ok,
            None => ok,
        });
    }
    inside.unwrap_or_else(|| Tensor::ones([indices.dims()[0]], &indices.device()))
}
