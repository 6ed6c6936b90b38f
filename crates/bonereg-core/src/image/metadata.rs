//! Image geometry without voxel data.

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};
use crate::error::{ImageError, Result};
use crate::spatial::{Direction, Point, Spacing, Vector};

/// Relative tolerance used by [`ImageMetadata::is_same_grid`], scaled by spacing.
pub const GRID_TOLERANCE: f64 = 1e-6;

/// Grid description of an image: voxel count plus the index-to-physical mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageMetadata<const D: usize> {
    /// Number of voxels along each index axis (x, y, z).
    pub size: [usize; D],
    /// Physical coordinate of the first voxel.
    pub origin: Point<D>,
    /// Physical distance between voxels along each axis.
    pub spacing: Spacing<D>,
    /// Orientation of the index axes.
    pub direction: Direction<D>,
}

impl<const D: usize> ImageMetadata<D> {
    pub fn new(size: [usize; D], origin: Point<D>, spacing: Spacing<D>, direction: Direction<D>) -> Self {
        Self {
            size,
            origin,
            spacing,
            direction,
        }
    }

    /// Spacing must be finite and positive and the direction invertible.
    pub fn validate(&self) -> Result<()> {
        if (0..D).any(|i| !self.spacing[i].is_finite() || self.spacing[i] <= 0.0) {
            return Err(ImageError::validation(format!(
                "spacing must be positive, got {:?}",
                self.spacing.to_vec()
            )));
        }
        if !self.direction.is_invertible() {
            return Err(ImageError::validation(format!(
                "direction matrix is singular (determinant {})",
                self.direction.determinant()
            )));
        }
        Ok(())
    }

    pub fn num_voxels(&self) -> usize {
        self.size.iter().product()
    }

    /// Tensor shape, i.e. the reversed size.
    pub fn shape(&self) -> [usize; D] {
        std::array::from_fn(|i| self.size[D - 1 - i])
    }

    /// Whether both grids place the same voxels at the same physical positions.
    pub fn is_same_grid(&self, other: &Self) -> bool {
        if self.size != other.size {
            return false;
        }
        let tol = GRID_TOLERANCE * self.spacing.min_spacing().max(1.0);
        let origin_ok = (0..D).all(|i| (self.origin[i] - other.origin[i]).abs() <= tol);
        let spacing_ok = (0..D).all(|i| (self.spacing[i] - other.spacing[i]).abs() <= tol);
        let direction_ok = (self.direction.0 - other.direction.0).abs().max() <= GRID_TOLERANCE;
        origin_ok && spacing_ok && direction_ok
    }

    /// `point = origin + direction * (index ∘ spacing)`
    pub fn index_to_physical(&self, index: &Point<D>) -> Point<D> {
        let mut scaled = Vector::<D>::zeros();
        for i in 0..D {
            scaled[i] = index[i] * self.spacing[i];
        }
        self.origin + self.direction * scaled
    }

    /// `index = (direction^-1 * (point - origin)) / spacing`
    pub fn physical_to_index(&self, point: &Point<D>) -> Point<D> {
        let inv_dir = self.inverse_direction();
        let rotated = inv_dir * (*point - self.origin);
        let mut index = Point::<D>::origin();
        for i in 0..D {
            index[i] = rotated[i] / self.spacing[i];
        }
        index
    }

    /// Batch physical-to-index mapping for a `[N, D]` tensor of points.
    pub fn world_to_index_tensor<B: Backend>(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = points.device();
        let inv_dir = self.inverse_direction();
        // idx = (p - o) @ T with T_rc = Dinv_cr / S_c
        let mut t_data = Vec::with_capacity(D * D);
        for r in 0..D {
            for c in 0..D {
                t_data.push((inv_dir[(c, r)] / self.spacing[c]) as f32);
            }
        }
        let t = Tensor::<B, 2>::from_data(TensorData::new(t_data, Shape::new([D, D])), &device);
        (points - self.origin_tensor::<B>(&device)).matmul(t)
    }

    /// Batch index-to-physical mapping for a `[N, D]` tensor of indices.
    pub fn index_to_world_tensor<B: Backend>(&self, indices: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = indices.device();
        // p = o + idx @ M with M_rc = S_r * D_cr
        let mut m_data = Vec::with_capacity(D * D);
        for r in 0..D {
            for c in 0..D {
                m_data.push((self.spacing[r] * self.direction[(c, r)]) as f32);
            }
        }
        let m = Tensor::<B, 2>::from_data(TensorData::new(m_data, Shape::new([D, D])), &device);
        indices.matmul(m) + self.origin_tensor::<B>(&device)
    }

    /// Images only carry validated grids; an unvalidated singular direction
    /// maps through its transpose.
    fn inverse_direction(&self) -> Direction<D> {
        self.direction
            .try_inverse()
            .unwrap_or_else(|| self.direction.transpose())
    }

    fn origin_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        let origin: Vec<f32> = (0..D).map(|i| self.origin[i] as f32).collect();
        Tensor::<B, 1>::from_data(TensorData::new(origin, Shape::new([D])), device).reshape([1, D])
    }
}
