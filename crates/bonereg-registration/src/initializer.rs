//! Centered transform initialization.

use burn::tensor::backend::Backend;
use nalgebra::Matrix3;
use bonereg_core::{AffineTransform, Image, ImageMetadata, Point};
use crate::config::InitializationStrategy;
use crate::error::Result;

/// Seeds an identity-matrix affine transform that maps the fixed center
/// onto the moving center.
///
/// The rotation center is the fixed center, and the translation is
/// `moving_center - fixed_center`, so `T(fixed_center) == moving_center`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CenteredTransformInitializer {
    strategy: InitializationStrategy,
}

impl CenteredTransformInitializer {
    pub fn new(strategy: InitializationStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> InitializationStrategy {
        self.strategy
    }

    pub fn initialize<B: Backend>(&self, fixed: &Image<B, 3>, moving: &Image<B, 3>) -> Result<AffineTransform<3>> {
        let (fixed_center, moving_center) = match self.strategy {
            InitializationStrategy::Geometry => (fixed.physical_center(), moving.physical_center()),
            InitializationStrategy::Moments => (moments_center(fixed)?, moments_center(moving)?),
        };
        tracing::debug!(
            "Initial centers: fixed {:?}, moving {:?} ({:?})",
            fixed_center.to_vec(),
            moving_center.to_vec(),
            self.strategy
        );
        let translation = moving_center - fixed_center;
        Ok(AffineTransform::new(Matrix3::identity(), translation, fixed_center))
    }
}

/// Physical intensity centroid, weighting each voxel by `value - min`.
///
/// Falls back to the geometric center when every voxel has the same value.
pub fn moments_center<B: Backend>(image: &Image<B, 3>) -> Result<Point<3>> {
    let values = image.to_vec()?;
    let meta = image.metadata();
    Ok(intensity_centroid(&values, &meta).unwrap_or_else(|| image.physical_center()))
}

fn intensity_centroid(values: &[f32], meta: &ImageMetadata<3>) -> Option<Point<3>> {
    let [nx, ny, _] = meta.size;
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let mut mass = 0.0f64;
    let mut sum = [0.0f64; 3];
    for (flat, &v) in values.iter().enumerate() {
        let w = (v - min) as f64;
        if w <= 0.0 {
            continue;
        }
        mass += w;
        sum[0] += w * (flat % nx) as f64;
        sum[1] += w * ((flat / nx) % ny) as f64;
        sum[2] += w * (flat / (nx * ny)) as f64;
    }
    if mass <= 0.0 || !mass.is_finite() {
        return None;
    }
    let index = Point::new([sum[0] / mass, sum[1] / mass, sum[2] / mass]);
    Some(meta.index_to_physical(&index))
}
