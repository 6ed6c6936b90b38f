//! Affine transform with a fixed centre.
//!
//! `T(x) = A (x - c) + c + t`
//!
//! During registration the transform maps points of the fixed image into the
//! moving image. Resampling the moving image through it therefore yields an
//! image aligned with the fixed grid.

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};
use nalgebra::{SMatrix, SVector};
use serde::{Deserialize, Serialize};
use crate::error::{ImageError, Result};
use crate::spatial::{Point, Vector};
use super::trait_::Transform;

/// Affine transform stored in f64.
///
/// Parameters are flattened as the row-major matrix followed by the
/// translation (`D * D + D` values, 12 for 3D). The centre is fixed and not
/// part of the parameter vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform<const D: usize> {
    matrix: SMatrix<f64, D, D>,
    translation: SVector<f64, D>,
    center: Point<D>,
}

impl<const D: usize> AffineTransform<D> {
    pub fn new(matrix: SMatrix<f64, D, D>, translation: Vector<D>, center: Point<D>) -> Self {
        Self {
            matrix,
            translation: translation.0,
            center,
        }
    }

    /// Identity transform around `center`.
    pub fn identity(center: Point<D>) -> Self {
        Self::new(SMatrix::identity(), Vector::zeros(), center)
    }

    /// Pure translation.
    pub fn from_translation(translation: Vector<D>) -> Self {
        Self::new(SMatrix::identity(), translation, Point::origin())
    }

    /// Number of optimisable parameters.
    pub const fn num_parameters() -> usize {
        D * D + D
    }

    /// Rebuild a transform from its flattened parameters.
    pub fn from_parameters(parameters: &[f64], center: Point<D>) -> Result<Self> {
        if parameters.len() != Self::num_parameters() {
            return Err(ImageError::shape_mismatch(
                &[Self::num_parameters()],
                &[parameters.len()],
            ));
        }
        let matrix = SMatrix::<f64, D, D>::from_row_slice(&parameters[..D * D]);
        let translation = SVector::<f64, D>::from_column_slice(&parameters[D * D..]);
        Ok(Self {
            matrix,
            translation,
            center,
        })
    }

    /// Flattened parameters: row-major matrix, then translation.
    pub fn parameters(&self) -> Vec<f64> {
        let mut params = Vec::with_capacity(Self::num_parameters());
        for r in 0..D {
            for c in 0..D {
                params.push(self.matrix[(r, c)]);
            }
        }
        params.extend(self.translation.iter().copied());
        params
    }

    pub fn matrix(&self) -> &SMatrix<f64, D, D> {
        &self.matrix
    }

    pub fn translation(&self) -> Vector<D> {
        Vector(self.translation)
    }

    pub fn center(&self) -> &Point<D> {
        &self.center
    }

    /// Constant term of the equivalent `A x + offset` form.
    pub fn offset(&self) -> Vector<D> {
        let c = self.center.0.coords;
        Vector(self.translation + c - self.matrix * c)
    }

    /// Map a single point.
    pub fn transform_point(&self, point: &Point<D>) -> Point<D> {
        let c = self.center.0.coords;
        let mapped = self.matrix * (point.0.coords - c) + c + self.translation;
        Point(mapped.into())
    }

    /// Inverse transform around the same centre, if the matrix is invertible.
    pub fn inverse(&self) -> Option<Self> {
        let inv = self.matrix.try_inverse()?;
        // T^-1(y) = A^-1 (y - c - t) + c = A^-1 (y - c) + c - A^-1 t
        Some(Self {
            matrix: inv,
            translation: -(inv * self.translation),
            center: self.center,
        })
    }

    /// `self` applied after `first`.
    pub fn compose(&self, first: &Self) -> Self {
        let matrix = self.matrix * first.matrix;
        let offset = self.matrix * first.offset().0 + self.offset().0;
        let c = first.center.0.coords;
        // keep `first`'s centre: offset = t + c - A c
        Self {
            matrix,
            translation: offset - c + matrix * c,
            center: first.center,
        }
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for AffineTransform<D> {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = points.device();
        // y = (x - c) @ A^T + c + t
        let mut a_t = Vec::with_capacity(D * D);
        for r in 0..D {
            for c in 0..D {
                a_t.push(self.matrix[(c, r)] as f32);
            }
        }
        let a_t = Tensor::<B, 2>::from_data(TensorData::new(a_t, Shape::new([D, D])), &device);
        let center: Vec<f32> = (0..D).map(|i| self.center[i] as f32).collect();
        let shift: Vec<f32> = (0..D)
            .map(|i| (self.center[i] + self.translation[i]) as f32)
            .collect();
        let center = Tensor::<B, 1>::from_data(TensorData::new(center, Shape::new([D])), &device)
            .reshape([1, D]);
        let shift = Tensor::<B, 1>::from_data(TensorData::new(shift, Shape::new([D])), &device)
            .reshape([1, D]);
        (points - center).matmul(a_t) + shift
    }
}
