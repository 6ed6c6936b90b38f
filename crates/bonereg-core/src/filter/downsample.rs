//! Isotropic downsampling by resampling onto a coarser grid.

use burn::tensor::backend::Backend;
use crate::error::{ImageError, Result};
use crate::image::{Image, ImageMetadata};
use crate::interpolation::{InterpolationMode, LinearInterpolator, NearestNeighborInterpolator};
use crate::transform::AffineTransform;
use super::resample::ResampleImageFilter;

/// Coarsens an image by a scalar factor while keeping origin and direction.
///
/// Spacing is multiplied by `factor` and the size becomes
/// `round(size / factor)` (at least 1) along every axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownsampleFilter {
    factor: f64,
}

impl DownsampleFilter {
    pub fn new(factor: f64) -> Result<Self> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(ImageError::validation(format!(
                "downsample factor must be positive, got {}",
                factor
            )));
        }
        Ok(Self { factor })
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Grid the filter produces for an input grid.
    pub fn output_metadata(&self, input: &ImageMetadata<3>) -> ImageMetadata<3> {
        let size = std::array::from_fn(|i| ((input.size[i] as f64 / self.factor).round() as usize).max(1));
        let spacing = input.spacing * self.factor;
        ImageMetadata::new(size, input.origin, spacing, input.direction)
    }

    pub fn apply<B: Backend>(&self, image: &Image<B, 3>, mode: InterpolationMode) -> Result<Image<B, 3>> {
        let output = self.output_metadata(&image.metadata());
        tracing::debug!("Downsampling {:?} -> {:?} (factor {})", image.size(), output.size, self.factor);
        let identity = AffineTransform::<3>::identity(*image.origin());
        match mode {
            InterpolationMode::Linear => {
                ResampleImageFilter::new(output, identity, LinearInterpolator::new()).apply(image)
            }
            InterpolationMode::NearestNeighbor => {
                ResampleImageFilter::new(output, identity, NearestNeighborInterpolator::new()).apply(image)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use crate::image::PixelType;
    use crate::spatial::{Direction, Point, Spacing};

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_output_grid() {
        let input = ImageMetadata::new([10, 5, 1], Point::new([1.0, 2.0, 3.0]), Spacing::new([0.5, 1.0, 2.0]), Direction::identity());
        let out = DownsampleFilter::new(2.0).unwrap().output_metadata(&input);
        assert_eq!(out.size, [5, 3, 1]);
        assert_eq!(out.spacing, Spacing::new([1.0, 2.0, 4.0]));
        assert_eq!(out.origin, input.origin);
    }

    #[test]
    fn test_samples_every_other_voxel() {
        let meta = ImageMetadata::new([8, 1, 1], Point::origin(), Spacing::uniform(1.0), Direction::identity());
        let values = (0..8).map(|v| v as f32).collect();
        let image = Image::<TestBackend, 3>::from_voxels(values, &meta, PixelType::Float32, &Default::default()).unwrap();
        let out = DownsampleFilter::new(2.0).unwrap().apply(&image, InterpolationMode::Linear).unwrap();
        assert_eq!(out.to_vec().unwrap(), vec![0.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_rejects_bad_factor() {
        assert!(DownsampleFilter::new(0.0).is_err());
        assert!(DownsampleFilter::new(-2.0).is_err());
    }
}
